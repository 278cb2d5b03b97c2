//! Ellipse shape.

use super::ShapeTrait;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// An ellipse shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center point.
    pub center: Point,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
}

impl Ellipse {
    /// Create a new ellipse.
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
        }
    }

    /// Create a circle.
    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(center, radius, radius)
    }

    /// Create an ellipse inscribed in a bounding rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }
}

impl ShapeTrait for Ellipse {
    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.center.x + self.radius_x,
            self.center.y + self.radius_y,
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.center += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rect_round_trips_bounds() {
        let rect = Rect::new(10.0, 20.0, 110.0, 70.0);
        let ellipse = Ellipse::from_rect(rect);
        assert_eq!(ellipse.bounds(), rect);
    }

    #[test]
    fn test_circle() {
        let circle = Ellipse::circle(Point::new(50.0, 50.0), 25.0);
        assert_eq!(circle.bounds(), Rect::new(25.0, 25.0, 75.0, 75.0));
    }
}
