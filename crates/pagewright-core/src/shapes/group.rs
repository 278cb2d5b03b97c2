//! Group shape for combining multiple objects.

use super::ShapeTrait;
use crate::object::{CanvasObject, ObjectId};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A group of objects manipulated as a single unit.
/// Groups can contain other groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Child objects, back to front.
    pub children: Vec<CanvasObject>,
}

impl Group {
    /// Create a new group from a list of objects.
    pub fn new(children: Vec<CanvasObject>) -> Self {
        Self { children }
    }

    /// Get the children of this group.
    pub fn children(&self) -> &[CanvasObject] {
        &self.children
    }

    /// Get all object IDs in this group (including nested groups).
    pub fn all_object_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        for child in &self.children {
            ids.push(child.id().clone());
            if let Some(group) = child.shape.as_group() {
                ids.extend(group.all_object_ids());
            }
        }
        ids
    }
}

impl ShapeTrait for Group {
    fn bounds(&self) -> Rect {
        self.children
            .iter()
            .map(CanvasObject::bounds)
            .reduce(|acc, b| acc.union(b))
            .unwrap_or(Rect::ZERO)
    }

    fn translate(&mut self, delta: Vec2) {
        for child in &mut self.children {
            child.translate(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Shape};
    use kurbo::Point;

    fn rect(x: f64, y: f64) -> CanvasObject {
        CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::new(x, y), 10.0, 10.0)))
    }

    #[test]
    fn test_group_bounds_union_children() {
        let group = Group::new(vec![rect(0.0, 0.0), rect(40.0, 20.0)]);
        assert_eq!(group.bounds(), Rect::new(0.0, 0.0, 50.0, 30.0));
    }

    #[test]
    fn test_translate_moves_children() {
        let mut group = Group::new(vec![rect(0.0, 0.0), rect(40.0, 20.0)]);
        group.translate(Vec2::new(5.0, 5.0));
        assert_eq!(group.bounds(), Rect::new(5.0, 5.0, 55.0, 35.0));
    }

    #[test]
    fn test_all_object_ids_includes_nested() {
        let inner = rect(0.0, 0.0);
        let inner_id = inner.id().clone();
        let nested = CanvasObject::new(Shape::Group(Group::new(vec![inner])));
        let nested_id = nested.id().clone();
        let outer = Group::new(vec![nested, rect(1.0, 1.0)]);

        let ids = outer.all_object_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&inner_id));
        assert!(ids.contains(&nested_id));
    }
}
