//! Polygon shape.

use super::ShapeTrait;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A closed polygon given by its vertices in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// An upward-pointing triangle filling the given box.
    pub fn triangle(bounds: Rect) -> Self {
        Self::new(vec![
            Point::new(bounds.center().x, bounds.y0),
            Point::new(bounds.x1, bounds.y1),
            Point::new(bounds.x0, bounds.y1),
        ])
    }
}

impl ShapeTrait for Polygon {
    fn bounds(&self) -> Rect {
        let mut points = self.points.iter();
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points.fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }

    fn translate(&mut self, delta: Vec2) {
        for point in &mut self.points {
            *point += delta;
        }
    }
}
