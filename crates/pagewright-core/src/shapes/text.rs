//! Text frame shape.

use super::ShapeTrait;
use crate::object::ObjectId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Default font family.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// A fixed-size text frame.
///
/// Frames can be chained: overflowing content flows into the frames listed in
/// `linked_object_ids`, in order. Layout of the flowed text is done elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    /// Top-left corner of the frame.
    pub position: Point,
    /// Frame width.
    pub width: f64,
    /// Frame height.
    pub height: f64,
    /// The text content held by this frame.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Font family name.
    pub font_family: String,
    /// Frames this frame flows into, in order.
    #[serde(default)]
    pub linked_object_ids: Vec<ObjectId>,
}

impl TextFrame {
    /// Create a new text frame.
    pub fn new(position: Point, width: f64, height: f64, content: impl Into<String>) -> Self {
        Self {
            position,
            width,
            height,
            content: content.into(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            linked_object_ids: Vec::new(),
        }
    }

    /// Whether this frame takes part in a flow chain.
    pub fn is_linked(&self) -> bool {
        !self.linked_object_ids.is_empty()
    }

    /// Drop `id` from the chain. Returns true if it was present.
    pub fn unlink(&mut self, id: &ObjectId) -> bool {
        let before = self.linked_object_ids.len();
        self.linked_object_ids.retain(|linked| linked != id);
        before != self.linked_object_ids.len()
    }
}

impl ShapeTrait for TextFrame {
    fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_defaults() {
        let frame = TextFrame::new(Point::new(0.0, 0.0), 200.0, 100.0, "Hello");
        assert_eq!(frame.content, "Hello");
        assert!((frame.font_size - DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
        assert!(!frame.is_linked());
    }

    #[test]
    fn test_unlink() {
        let mut frame = TextFrame::new(Point::ZERO, 10.0, 10.0, "");
        let a = ObjectId::from("a");
        let b = ObjectId::from("b");
        frame.linked_object_ids = vec![a.clone(), b.clone()];

        assert!(frame.unlink(&a));
        assert!(!frame.unlink(&a));
        assert_eq!(frame.linked_object_ids, vec![b]);
    }
}
