//! Live canvas objects and their identity rules.

use crate::shapes::{Shape, ShapeKind, ShapeStyle};
use kurbo::{Affine, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of an object within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Mint a fresh, globally unique id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id that is empty or blank counts as missing.
    pub fn is_missing(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Inheritance metadata carried by objects instantiated from a master page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterLink {
    /// Id of the master page the object comes from.
    pub master_id: String,
    /// Identity of the object within the master, used as the override key.
    pub master_object_id: String,
    /// Whether pages may replace this object with a local copy.
    pub overridable: bool,
}

/// Rotation and scale applied on top of the shape geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Rotation in degrees, clockwise, around the object's center.
    pub angle: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
}

impl Placement {
    pub fn is_identity(&self) -> bool {
        self.angle == 0.0 && self.scale_x == 1.0 && self.scale_y == 1.0
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// A renderable object on a page.
///
/// Identity (`id`) and master metadata are only settable inside the crate; an
/// inherited object can only become editable by being replaced through
/// [`override_master_object`](crate::overrides::override_master_object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub(crate) id: ObjectId,
    /// Shape geometry.
    pub shape: Shape,
    /// Paint style.
    pub style: ShapeStyle,
    /// Rotation and scale.
    pub placement: Placement,
    /// Whether the object is drawn.
    pub visible: bool,
    /// Whether the object can be selected and edited directly.
    pub selectable: bool,
    /// Whether the object receives pointer events (hit-testing).
    pub evented: bool,
    pub(crate) master: Option<MasterLink>,
}

impl CanvasObject {
    /// Create a page-local object with a fresh id and the default style for its kind.
    pub fn new(shape: Shape) -> Self {
        let style = match shape.kind() {
            ShapeKind::Line => ShapeStyle::stroked(),
            ShapeKind::TextFrame => ShapeStyle::text(),
            _ => ShapeStyle::filled(),
        };
        Self {
            id: ObjectId::new(),
            shape,
            style,
            placement: Placement::default(),
            visible: true,
            selectable: true,
            evented: true,
            master: None,
        }
    }

    /// Builder-style id override, for objects created with a known id.
    pub fn with_id(mut self, id: impl Into<ObjectId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// Master metadata, present only on inherited objects.
    pub fn master(&self) -> Option<&MasterLink> {
        self.master.as_ref()
    }

    pub fn is_from_master(&self) -> bool {
        self.master.is_some()
    }

    /// Ids of the frames this object flows text into (empty for non-text objects).
    pub fn linked_object_ids(&self) -> &[ObjectId] {
        self.shape
            .as_text_frame()
            .map(|t| t.linked_object_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Turn this object into an inherited instance of `link`.
    ///
    /// Inherited objects are not selectable but stay hit-testable so the editor
    /// can offer the override action.
    pub(crate) fn into_master_instance(mut self, id: ObjectId, link: MasterLink) -> Self {
        self.id = id;
        self.master = Some(link);
        self.selectable = false;
        self.evented = true;
        self
    }

    /// Independent page-local copy with a fresh id and no master metadata.
    pub(crate) fn detached_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.id = ObjectId::new();
        copy.master = None;
        copy.selectable = true;
        copy.evented = true;
        copy
    }

    /// Transform from shape space to page space (scale about the top-left, rotate about the center).
    pub fn transform(&self) -> Affine {
        if self.placement.is_identity() {
            return Affine::IDENTITY;
        }
        let local = self.shape.bounds();
        let origin = local.origin().to_vec2();
        let scale = Affine::translate(origin)
            * Affine::scale_non_uniform(self.placement.scale_x, self.placement.scale_y)
            * Affine::translate(-origin);
        let center = scale.transform_rect_bbox(local).center();
        Affine::rotate_about(self.placement.angle.to_radians(), center) * scale
    }

    /// Axis-aligned bounding box in page coordinates.
    pub fn bounds(&self) -> Rect {
        let local = self.shape.bounds();
        if self.placement.is_identity() {
            return local;
        }
        self.transform().transform_rect_bbox(local)
    }

    /// Move the object by `delta` in page coordinates.
    pub fn translate(&mut self, delta: Vec2) {
        self.shape.translate(delta);
    }

    /// Consuming variant of [`translate`](Self::translate).
    pub fn translated(mut self, delta: Vec2) -> Self {
        self.translate(delta);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Line, Rectangle, TextFrame};
    use kurbo::Point;

    fn rect() -> CanvasObject {
        CanvasObject::new(Shape::Rectangle(Rectangle::new(
            Point::new(0.0, 0.0),
            100.0,
            50.0,
        )))
    }

    #[test]
    fn test_new_objects_are_local_and_editable() {
        let obj = rect();
        assert!(!obj.is_from_master());
        assert!(obj.selectable);
        assert!(obj.visible);
        assert!(!obj.id().is_missing());
    }

    #[test]
    fn test_default_style_by_kind() {
        let line = CanvasObject::new(Shape::Line(Line::new(Point::ZERO, Point::new(10.0, 0.0))));
        assert!(line.style.stroke.is_some());
        assert!(line.style.fill.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(rect().id(), rect().id());
    }

    #[test]
    fn test_scaled_bounds() {
        let obj = rect().with_placement(Placement {
            angle: 0.0,
            scale_x: 2.0,
            scale_y: 0.5,
        });
        let bounds = obj.bounds();
        assert!((bounds.x0 - 0.0).abs() < 1e-9);
        assert!((bounds.x1 - 200.0).abs() < 1e-9);
        assert!((bounds.y1 - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_bounds_keep_center() {
        let obj = rect().with_placement(Placement {
            angle: 90.0,
            ..Placement::default()
        });
        let bounds = obj.bounds();
        assert!((bounds.width() - 50.0).abs() < 1e-9);
        assert!((bounds.height() - 100.0).abs() < 1e-9);
        assert!((bounds.center().x - 50.0).abs() < 1e-9);
        assert!((bounds.center().y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_master_instance_and_detached_copy() {
        let link = MasterLink {
            master_id: "m".into(),
            master_object_id: "obj-1".into(),
            overridable: true,
        };
        let instance = rect().into_master_instance(ObjectId::from("p:m:obj-1"), link);
        assert!(instance.is_from_master());
        assert!(!instance.selectable);
        assert!(instance.evented);

        let copy = instance.detached_copy();
        assert!(!copy.is_from_master());
        assert!(copy.selectable);
        assert_ne!(copy.id(), instance.id());
        assert_eq!(copy.shape, instance.shape);
    }

    #[test]
    fn test_linked_ids_only_on_text() {
        let mut frame = TextFrame::new(Point::ZERO, 10.0, 10.0, "x");
        frame.linked_object_ids.push(ObjectId::from("next"));
        let obj = CanvasObject::new(Shape::TextFrame(frame));
        assert_eq!(obj.linked_object_ids(), &[ObjectId::from("next")]);
        assert!(rect().linked_object_ids().is_empty());
    }
}
