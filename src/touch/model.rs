use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the input source to one continuous contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub u64);

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub color: Color,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Color::rgba(0, 0, 0, 128),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    Begin,
    Update,
    End,
    /// The window system aborted the contact.
    Cancel,
}

impl TouchEventKind {
    pub fn as_label(self) -> &'static str {
        match self {
            TouchEventKind::Begin => "begin",
            TouchEventKind::Update => "update",
            TouchEventKind::End => "end",
            TouchEventKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TouchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchEventKind,
    pub id: TouchId,
    /// Window-relative position.
    pub position: Point,
    /// Screen position; equals `position` when the window origin is unknown.
    pub root: Point,
}

impl TouchEvent {
    pub fn begin(id: u64, x: f64, y: f64) -> Self {
        Self::new(TouchEventKind::Begin, id, x, y)
    }

    pub fn update(id: u64, x: f64, y: f64) -> Self {
        Self::new(TouchEventKind::Update, id, x, y)
    }

    pub fn end(id: u64, x: f64, y: f64) -> Self {
        Self::new(TouchEventKind::End, id, x, y)
    }

    pub fn cancel(id: u64, x: f64, y: f64) -> Self {
        Self::new(TouchEventKind::Cancel, id, x, y)
    }

    /// Places the event on screen, given the window's top-left corner.
    pub fn with_window_origin(mut self, origin: Point) -> Self {
        self.root = Point::new(origin.x + self.position.x, origin.y + self.position.y);
        self
    }

    fn new(kind: TouchEventKind, id: u64, x: f64, y: f64) -> Self {
        let position = Point::new(x, y);
        Self {
            kind,
            id: TouchId(id),
            position,
            root: position,
        }
    }
}

/// Axis-aligned box in surface coordinates, `min` inclusive and `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn around(center: Point, half_extent: f64) -> Self {
        Self {
            min: Point::new(center.x - half_extent, center.y - half_extent),
            max: Point::new(center.x + half_extent, center.y + half_extent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Ring { center: Point, radius: f64 },
    Segment { from: Point, to: Point },
    Square { center: Point, size: f64 },
}

impl Shape {
    pub fn bounds(&self) -> Bounds {
        match *self {
            Shape::Ring { center, radius } => Bounds::around(center, radius),
            Shape::Segment { from, to } => Bounds::spanning(from, to),
            Shape::Square { center, size } => Bounds::around(center, size / 2.0),
        }
    }
}

/// What a touch transition wants drawn into the ink layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawIntent {
    pub id: TouchId,
    pub shape: Shape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_bounds_extend_radius_in_every_direction() {
        let shape = Shape::Ring {
            center: Point::new(100.0, 100.0),
            radius: 30.0,
        };
        assert_eq!(
            shape.bounds(),
            Bounds {
                min: Point::new(70.0, 70.0),
                max: Point::new(130.0, 130.0),
            }
        );
    }

    #[test]
    fn segment_bounds_span_both_endpoints_regardless_of_direction() {
        let shape = Shape::Segment {
            from: Point::new(120.0, 40.0),
            to: Point::new(100.0, 110.0),
        };
        assert_eq!(
            shape.bounds(),
            Bounds {
                min: Point::new(100.0, 40.0),
                max: Point::new(120.0, 110.0),
            }
        );
    }

    #[test]
    fn square_bounds_use_half_size() {
        let shape = Shape::Square {
            center: Point::new(130.0, 120.0),
            size: 30.0,
        };
        assert_eq!(
            shape.bounds(),
            Bounds {
                min: Point::new(115.0, 105.0),
                max: Point::new(145.0, 135.0),
            }
        );
    }

    #[test]
    fn root_position_is_offset_by_window_origin() {
        let event = TouchEvent::update(3, 10.0, 20.0);
        assert_eq!(event.root, event.position);

        let placed = event.with_window_origin(Point::new(100.0, 50.0));
        assert_eq!(placed.position, Point::new(10.0, 20.0));
        assert_eq!(placed.root, Point::new(110.0, 70.0));
    }
}
