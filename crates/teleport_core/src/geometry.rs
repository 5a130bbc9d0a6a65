//! Geometry in the shared coordinate space
//!
//! Source and destination observers report their bounds as [`Rect`]s in one
//! coordinate space that spans the whole window. The overlay converts those
//! rectangles into its own space at render time.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size::new(0.0, 0.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Size { width, height }
    }
}

/// Axis-aligned bounds, origin at the top-left corner
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_origin_size(origin: Point, size: Size) -> Self {
        Rect { origin, size }
    }

    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    pub fn max_x(&self) -> f32 {
        self.min_x() + self.width()
    }

    pub fn max_y(&self) -> f32 {
        self.min_y() + self.height()
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    /// Same size, moved by (`dx`, `dy`)
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect::new(self.min_x() + dx, self.min_y() + dy, self.width(), self.height())
    }

    /// Scale origin and size uniformly (e.g. points to pixels)
    pub fn scale(&self, factor: f32) -> Self {
        Rect::new(
            self.min_x() * factor,
            self.min_y() * factor,
            self.width() * factor,
            self.height() * factor,
        )
    }

    /// Shrink every edge by `amount`; size never goes negative
    pub fn inset(&self, amount: f32) -> Self {
        Rect::new(
            self.min_x() + amount,
            self.min_y() + amount,
            (self.width() - 2.0 * amount).max(0.0),
            (self.height() - 2.0 * amount).max(0.0),
        )
    }

    /// Non-finite bounds come from collapsed or not-yet-laid-out views and are
    /// never accepted as anchors.
    pub fn is_finite(&self) -> bool {
        [self.origin.x, self.origin.y, self.size.width, self.size.height]
            .iter()
            .all(|c| c.is_finite())
    }
}

/// Shape of rounded corners applied to the overlay clip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerStyle {
    /// Quarter-circle arcs
    #[default]
    Circular,
    /// Continuous curvature ("squircle")
    Continuous,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_follow_origin_and_size() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!((rect.min_x(), rect.min_y()), (10.0, 20.0));
        assert_eq!((rect.max_x(), rect.max_y()), (110.0, 70.0));
    }

    #[test]
    fn test_offset_scale_and_inset() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.offset(-10.0, -20.0), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(rect.scale(2.0), Rect::new(20.0, 40.0, 200.0, 100.0));
        assert_eq!(rect.inset(5.0), Rect::new(15.0, 25.0, 90.0, 40.0));
        assert_eq!(rect.inset(40.0).height(), 0.0);
    }

    #[test]
    fn test_non_finite_bounds_are_detected() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_finite());
        assert!(!Rect::new(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(!Rect::new(0.0, 0.0, f32::INFINITY, 1.0).is_finite());
    }

    #[test]
    fn test_corner_style_uses_snake_case_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            style: CornerStyle,
        }
        let parsed: Wrapper = toml::from_str("style = \"continuous\"").unwrap();
        assert_eq!(parsed.style, CornerStyle::Continuous);
    }
}
