//! Rectangle shape.

use super::ShapeTrait;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle, optionally with rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Top-left corner.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Horizontal corner radius.
    #[serde(default)]
    pub rx: f64,
    /// Vertical corner radius.
    #[serde(default)]
    pub ry: f64,
}

impl Rectangle {
    /// Sharp-cornered rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            rx: 0.0,
            ry: 0.0,
        }
    }

    /// Round the corners, capping each radius at half the matching side.
    pub fn rounded(mut self, rx: f64, ry: f64) -> Self {
        self.rx = rx.max(0.0).min(self.width.max(0.0) / 2.0);
        self.ry = ry.max(0.0).min(self.height.max(0.0) / 2.0);
        self
    }

    pub fn is_rounded(&self) -> bool {
        self.rx > 0.0 || self.ry > 0.0
    }
}

impl ShapeTrait for Rectangle {
    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_and_translate() {
        let mut rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        assert_eq!(rect.bounds(), Rect::new(10.0, 20.0, 110.0, 70.0));
        rect.translate(Vec2::new(-10.0, 5.0));
        assert_eq!(rect.position, Point::new(0.0, 25.0));
    }

    #[test]
    fn test_rounded_caps_radii() {
        let rect = Rectangle::new(Point::ZERO, 40.0, 10.0).rounded(30.0, 3.0);
        assert!((rect.rx - 20.0).abs() < f64::EPSILON);
        assert!((rect.ry - 3.0).abs() < f64::EPSILON);
        assert!(rect.is_rounded());
        assert!(!Rectangle::new(Point::ZERO, 1.0, 1.0).is_rounded());
    }

    #[test]
    fn test_negative_radius_is_sharp() {
        let rect = Rectangle::new(Point::ZERO, 40.0, 10.0).rounded(-4.0, -1.0);
        assert!(!rect.is_rounded());
    }
}
