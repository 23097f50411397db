use crate::touch::composite::{blend_pixel, color_at, store};
use crate::touch::error::SurfaceError;
use crate::touch::model::{Bounds, Color, Point, Shape, StrokeStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

// Far enough outside any surface that every edge sum below stays in range.
const COORD_LIMIT: f64 = (i32::MAX / 4) as f64;

impl DirtyRect {
    /// Smallest pixel rect covering `bounds` grown by `pad` on every side.
    ///
    /// Coordinates are limited to ±`i32::MAX / 4`, so wild input still yields a
    /// rect that can be clamped; NaN collapses to the origin.
    pub fn from_bounds(bounds: Bounds, pad: f64) -> Self {
        let limit = |v: f64| v.clamp(-COORD_LIMIT, COORD_LIMIT);
        let x0 = limit((bounds.min.x - pad).floor()) as i32;
        let y0 = limit((bounds.min.y - pad).floor()) as i32;
        let x1 = limit((bounds.max.x + pad).ceil()) as i32;
        let y1 = limit((bounds.max.y + pad).ceil()) as i32;
        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        }
    }

    fn right(self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    fn bottom(self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        DirtyRect {
            x: min_x,
            y: min_y,
            width: saturate(max_x - i64::from(min_x)).max(1),
            height: saturate(max_y - i64::from(min_y)).max(1),
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = i64::from(width);
        let max_h = i64::from(height);
        let x0 = i64::from(self.x).clamp(0, max_w);
        let y0 = i64::from(self.y).clamp(0, max_h);
        let x1 = self.right().clamp(0, max_w);
        let y1 = self.bottom().clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: saturate(x0),
            y: saturate(y0),
            width: saturate(x1 - x0),
            height: saturate(y1 - y0),
        })
    }

    #[cfg(test)]
    pub(crate) fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && i64::from(x) < self.right() && i64::from(y) < self.bottom()
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Straight-alpha RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32, fill: Color) -> Result<Self, SurfaceError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .filter(|len| *len > 0 && width <= i32::MAX as u32 && height <= i32::MAX as u32)
            .ok_or(SurfaceError::InvalidSize { width, height })?;
        let mut pixels = vec![0u8; len];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A new surface with the same dimensions as `self`.
    pub fn similar(&self, fill: Color) -> Self {
        let mut pixels = vec![0u8; self.pixels.len()];
        for px in pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[fill.r, fill.g, fill.b, fill.a]);
        }
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn full_rect(&self) -> DirtyRect {
        DirtyRect {
            x: 0,
            y: 0,
            width: self.width as i32,
            height: self.height as i32,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Colour at (`x`, `y`), or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Some(color_at(&self.pixels, idx))
    }

    pub fn clear_rect(&mut self, rect: DirtyRect, color: Color) {
        let Some(rect) = rect.clamp(self.width, self.height) else {
            return;
        };
        for y in rect.y..(rect.y + rect.height) {
            for x in rect.x..(rect.x + rect.width) {
                let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
                store(&mut self.pixels, idx, color);
            }
        }
    }

    /// Strokes the outline of `shape` with anti-aliased coverage.
    ///
    /// Each pixel is blended at most once, so overlapping parts of one outline
    /// do not darken. Returns the clamped area that was examined.
    pub fn stroke(&mut self, shape: &Shape, style: StrokeStyle) -> Option<DirtyRect> {
        let half_width = style.width.max(0.0) / 2.0;
        let area = stroke_dirty_bounds(shape, style.width).clamp(self.width, self.height)?;

        for y in area.y..(area.y + area.height) {
            for x in area.x..(area.x + area.width) {
                let sample = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let coverage = (half_width + 0.5 - outline_distance(shape, sample)).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let alpha = (style.color.a as f64 * coverage).round() as u8;
                if alpha == 0 {
                    continue;
                }
                let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
                let top = Color {
                    a: alpha,
                    ..style.color
                };
                let blended = blend_pixel(color_at(&self.pixels, idx), top);
                store(&mut self.pixels, idx, blended);
            }
        }
        Some(area)
    }
}

/// Damage area for stroking `shape`: its bounds plus the stroke's reach.
pub fn stroke_dirty_bounds(shape: &Shape, stroke_width: f64) -> DirtyRect {
    DirtyRect::from_bounds(shape.bounds(), stroke_width.max(0.0) / 2.0 + 1.0)
}

fn outline_distance(shape: &Shape, point: Point) -> f64 {
    match *shape {
        Shape::Ring { center, radius } => {
            let dx = point.x - center.x;
            let dy = point.y - center.y;
            ((dx * dx + dy * dy).sqrt() - radius).abs()
        }
        Shape::Segment { from, to } => point_segment_distance_sq(point, from, to).sqrt(),
        Shape::Square { center, size } => {
            let half = size / 2.0;
            let (x0, x1) = (center.x - half, center.x + half);
            let (y0, y1) = (center.y - half, center.y + half);
            let dx = (x0 - point.x).max(point.x - x1).max(0.0);
            let dy = (y0 - point.y).max(point.y - y1).max(0.0);
            if dx > 0.0 || dy > 0.0 {
                // Chebyshev distance outside keeps the corners square.
                dx.max(dy)
            } else {
                (point.x - x0)
                    .min(x1 - point.x)
                    .min(point.y - y0)
                    .min(y1 - point.y)
            }
        }
    }
}

fn point_segment_distance_sq(point: Point, start: Point, end: Point) -> f64 {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let wx = point.x - start.x;
    let wy = point.y - start.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq <= f64::EPSILON {
        return wx * wx + wy * wy;
    }
    let t = ((wx * vx + wy * vy) / len_sq).clamp(0.0, 1.0);
    let dx = point.x - (start.x + vx * t);
    let dy = point.y - (start.y + vy * t);
    dx * dx + dy * dy
}

/// Packs RGBA pixels inside `rect` into `0x00RRGGBB` words, as window buffers expect.
pub fn convert_rgba_to_xrgb_rect(rgba: &[u8], xrgb: &mut [u32], width: u32, rect: DirtyRect) {
    for y in rect.y..(rect.y + rect.height) {
        for x in rect.x..(rect.x + rect.width) {
            let pixel = (y as u32 * width + x as u32) as usize;
            let idx = pixel * 4;
            if idx + 3 >= rgba.len() || pixel >= xrgb.len() {
                continue;
            }
            xrgb[pixel] = (rgba[idx] as u32) << 16 | (rgba[idx + 1] as u32) << 8 | rgba[idx + 2] as u32;
        }
    }
}
