use crate::touch::composite::{mask_rect, paint_rect};
use crate::touch::error::SurfaceError;
use crate::touch::model::{Color, DrawIntent, Point, Shape, StrokeStyle};
use crate::touch::render::{stroke_dirty_bounds, DirtyRect, Surface};

/// Something that can show the front buffer, usually a window.
pub trait PresentTarget {
    fn present(&mut self, front: &Surface, region: DirtyRect) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorStyle {
    pub background: Color,
    pub ink: StrokeStyle,
    pub contact_marker: StrokeStyle,
    pub contact_marker_radius: f64,
}

impl Default for CompositorStyle {
    fn default() -> Self {
        Self {
            background: Color::rgba(217, 217, 217, 255),
            ink: StrokeStyle::default(),
            contact_marker: StrokeStyle {
                width: 2.0,
                color: Color::rgba(200, 30, 30, 160),
            },
            contact_marker_radius: 8.0,
        }
    }
}

/// Ink, overlay and front surfaces.
///
/// Touch drawing only ever lands in `ink`; `front` is rebuilt from `ink` and
/// `overlay` by [`LayeredCompositor::composite`] and holds nothing else.
#[derive(Debug)]
pub struct LayeredCompositor {
    ink: Surface,
    overlay: Surface,
    front: Surface,
    style: CompositorStyle,
    pending: Option<DirtyRect>,
    marker_area: Option<DirtyRect>,
    #[cfg(test)]
    composite_count: usize,
}

impl LayeredCompositor {
    pub fn new(width: u32, height: u32, style: CompositorStyle) -> Result<Self, SurfaceError> {
        let ink = Surface::new(width, height, style.background)?;
        let overlay = ink.similar(Color::TRANSPARENT);
        let front = ink.similar(style.background);
        Ok(Self {
            ink,
            overlay,
            front,
            style,
            pending: None,
            marker_area: None,
            #[cfg(test)]
            composite_count: 0,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.front.size()
    }

    pub fn ink(&self) -> &Surface {
        &self.ink
    }

    pub fn overlay(&self) -> &Surface {
        &self.overlay
    }

    pub fn front(&self) -> &Surface {
        &self.front
    }

    pub fn pending_damage(&self) -> Option<DirtyRect> {
        self.pending
    }

    /// Strokes `intent` into the ink layer and schedules its area for recompositing.
    pub fn draw(&mut self, intent: &DrawIntent) -> Option<DirtyRect> {
        let touched = self.ink.stroke(&intent.shape, self.style.ink)?;
        self.request_redraw(touched);
        Some(touched)
    }

    pub fn request_redraw(&mut self, region: DirtyRect) {
        let (width, height) = self.size();
        let Some(region) = region.clamp(width, height) else {
            return;
        };
        self.pending = Some(
            self.pending
                .map(|pending| pending.union(region))
                .unwrap_or(region),
        );
    }

    pub fn request_full_redraw(&mut self) {
        self.pending = Some(self.front.full_rect());
    }

    /// Rebuilds `region` of the front buffer: ink first, then overlay masked by its alpha.
    pub fn composite(&mut self, region: DirtyRect) -> Result<(), SurfaceError> {
        paint_rect(&mut self.front, &self.ink, region)?;
        mask_rect(&mut self.front, &self.overlay, region)?;
        #[cfg(test)]
        {
            self.composite_count += 1;
        }
        Ok(())
    }

    pub fn present<T: PresentTarget + ?Sized>(
        &self,
        target: &mut T,
        region: DirtyRect,
    ) -> anyhow::Result<()> {
        let (width, height) = self.size();
        match region.clamp(width, height) {
            Some(region) => target.present(&self.front, region),
            None => Ok(()),
        }
    }

    /// Composites and presents all damage recorded since the last flush.
    ///
    /// Returns `Ok(false)` when nothing was pending. On failure the region stays
    /// pending, so the next flush presents it again.
    pub fn flush<T: PresentTarget + ?Sized>(&mut self, target: &mut T) -> anyhow::Result<bool> {
        let Some(region) = self.pending.take() else {
            return Ok(false);
        };
        let presented = self
            .composite(region)
            .map_err(anyhow::Error::from)
            .and_then(|()| self.present(target, region));
        if let Err(err) = presented {
            self.request_redraw(region);
            return Err(err);
        }
        Ok(true)
    }

    /// Replaces the overlay with one crosshair per live contact.
    pub fn set_contact_markers(&mut self, points: &[Point]) {
        if let Some(previous) = self.marker_area.take() {
            self.overlay.clear_rect(previous, Color::TRANSPARENT);
            self.request_redraw(previous);
        }

        let radius = self.style.contact_marker_radius;
        let mut area: Option<DirtyRect> = None;
        for point in points {
            for shape in crosshair(*point, radius) {
                let bounds = stroke_dirty_bounds(&shape, self.style.contact_marker.width);
                if self.overlay.stroke(&shape, self.style.contact_marker).is_some() {
                    area = Some(area.map(|a| a.union(bounds)).unwrap_or(bounds));
                }
            }
        }

        let (width, height) = self.size();
        self.marker_area = area.and_then(|a| a.clamp(width, height));
        if let Some(area) = self.marker_area {
            self.request_redraw(area);
        }
    }

    #[cfg(test)]
    pub fn composite_count(&self) -> usize {
        self.composite_count
    }
}

fn crosshair(center: Point, radius: f64) -> [Shape; 2] {
    [
        Shape::Segment {
            from: Point::new(center.x - radius, center.y),
            to: Point::new(center.x + radius, center.y),
        },
        Shape::Segment {
            from: Point::new(center.x, center.y - radius),
            to: Point::new(center.x, center.y + radius),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::model::TouchId;

    #[derive(Default)]
    struct RecordingTarget {
        frames: Vec<(DirtyRect, Vec<u8>)>,
    }

    impl PresentTarget for RecordingTarget {
        fn present(&mut self, front: &Surface, region: DirtyRect) -> anyhow::Result<()> {
            self.frames.push((region, front.pixels().to_vec()));
            Ok(())
        }
    }

    fn compositor() -> LayeredCompositor {
        LayeredCompositor::new(200, 200, CompositorStyle::default()).expect("compositor")
    }

    fn ring(x: f64, y: f64) -> DrawIntent {
        DrawIntent {
            id: TouchId(1),
            shape: Shape::Ring {
                center: Point::new(x, y),
                radius: 30.0,
            },
        }
    }

    #[test]
    fn drawing_touches_ink_but_never_front() {
        let mut compositor = compositor();
        let front_before = compositor.front().clone();

        compositor.draw(&ring(100.0, 100.0)).expect("visible");

        assert_eq!(compositor.front(), &front_before);
        assert_ne!(compositor.ink().pixel(129, 100), Some(CompositorStyle::default().background));
        assert!(compositor.pending_damage().is_some());
    }

    #[test]
    fn composite_is_idempotent() {
        let mut compositor = compositor();
        compositor.draw(&ring(100.0, 100.0));
        compositor.set_contact_markers(&[Point::new(50.0, 50.0)]);

        let full = compositor.front().full_rect();
        compositor.composite(full).expect("composite");
        let first = compositor.front().clone();
        compositor.composite(full).expect("composite again");

        assert_eq!(compositor.front(), &first);
    }

    #[test]
    fn front_is_derived_from_ink_and_overlay_only() {
        let mut compositor = compositor();
        compositor.draw(&ring(100.0, 100.0));
        let full = compositor.front().full_rect();
        compositor.composite(full).expect("composite");
        let expected = compositor.front().clone();

        compositor.front.clear_rect(full, Color::rgba(1, 2, 3, 255));
        compositor.composite(full).expect("rebuild");

        assert_eq!(compositor.front(), &expected);
    }

    #[test]
    fn redraw_requests_coalesce_into_one_flush() {
        let mut compositor = compositor();
        let mut target = RecordingTarget::default();
        compositor.draw(&ring(40.0, 40.0));
        compositor.draw(&ring(150.0, 150.0));

        assert!(compositor.flush(&mut target).expect("flush"));
        assert!(!compositor.flush(&mut target).expect("second flush"));

        assert_eq!(target.frames.len(), 1);
        assert_eq!(compositor.composite_count(), 1);
        let region = target.frames[0].0;
        assert!(region.contains(9, 9));
        assert!(region.contains(181, 181));
    }

    #[test]
    fn overlay_markers_are_replaced_without_touching_ink() {
        let mut compositor = compositor();
        compositor.draw(&ring(100.0, 100.0));
        let ink = compositor.ink().clone();

        compositor.set_contact_markers(&[Point::new(20.0, 20.0)]);
        assert_ne!(compositor.overlay().pixel(20, 20), Some(Color::TRANSPARENT));

        compositor.set_contact_markers(&[Point::new(150.0, 150.0)]);
        assert_eq!(compositor.overlay().pixel(20, 20), Some(Color::TRANSPARENT));
        assert_ne!(compositor.overlay().pixel(150, 150), Some(Color::TRANSPARENT));

        compositor.set_contact_markers(&[]);
        assert!(compositor
            .overlay()
            .pixels()
            .chunks_exact(4)
            .all(|px| px[3] == 0));
        assert_eq!(compositor.ink(), &ink);
    }

    #[test]
    fn overlay_shows_on_front_only_where_it_has_alpha() {
        let mut compositor = compositor();
        let background = CompositorStyle::default().background;
        compositor.set_contact_markers(&[Point::new(100.0, 100.0)]);
        let full = compositor.front().full_rect();
        compositor.composite(full).expect("composite");

        assert_ne!(compositor.front().pixel(100, 100), Some(background));
        assert_eq!(compositor.front().pixel(10, 10), Some(background));
    }

    #[test]
    fn markers_removed_restore_plain_ink_on_front() {
        let mut compositor = compositor();
        let mut target = RecordingTarget::default();
        compositor.set_contact_markers(&[Point::new(100.0, 100.0)]);
        compositor.flush(&mut target).expect("flush");

        compositor.set_contact_markers(&[]);
        compositor.flush(&mut target).expect("flush");

        assert_eq!(compositor.front(), compositor.ink());
    }

    #[test]
    fn failed_present_keeps_damage_pending() {
        struct Flaky {
            fail: bool,
            regions: Vec<DirtyRect>,
        }
        impl PresentTarget for Flaky {
            fn present(&mut self, _: &Surface, region: DirtyRect) -> anyhow::Result<()> {
                if self.fail {
                    anyhow::bail!("surface lost");
                }
                self.regions.push(region);
                Ok(())
            }
        }

        let mut compositor = compositor();
        let mut target = Flaky {
            fail: true,
            regions: Vec::new(),
        };
        let drawn = compositor.draw(&ring(100.0, 100.0)).expect("visible");

        assert!(compositor.flush(&mut target).is_err());
        assert_eq!(compositor.pending_damage(), Some(drawn));

        target.fail = false;
        assert!(compositor.flush(&mut target).expect("retry"));
        assert_eq!(target.regions, vec![drawn]);
        assert_eq!(compositor.pending_damage(), None);
    }

    #[test]
    fn out_of_bounds_redraw_requests_are_dropped() {
        let mut compositor = compositor();
        compositor.request_redraw(DirtyRect {
            x: 500,
            y: 500,
            width: 10,
            height: 10,
        });
        assert_eq!(compositor.pending_damage(), None);
    }

    #[test]
    fn zero_sized_window_fails_initialization() {
        assert!(LayeredCompositor::new(0, 0, CompositorStyle::default()).is_err());
    }
}
