//! Live objects to snapshot records.

use super::*;
use crate::live::LiveObjectSet;
use crate::object::CanvasObject;
use crate::shapes::{SerializableColor, Shape, ShapeStyle};
use serde_json::{Map, Value, json};

/// Serialize the live objects of a page, back to front.
///
/// Objects with a missing id are given a fresh one first, so no snapshot entry
/// is ever written without an id.
pub fn serialize(objects: &mut LiveObjectSet, background: &str) -> Snapshot {
    for id in objects.ensure_ids() {
        log::debug!("Assigned missing object id {} before serializing", id);
    }
    Snapshot {
        version: SNAPSHOT_VERSION.to_string(),
        objects: encode_objects(objects.ordered()),
        background: background.to_string(),
    }
}

/// Encode a sequence of objects.
pub fn encode_objects<'a>(objects: impl IntoIterator<Item = &'a CanvasObject>) -> Vec<SerializedObject> {
    objects.into_iter().map(encode_object).collect()
}

/// Encode one object: its kind's geometry, its style and the allow-listed custom fields.
pub fn encode_object(object: &CanvasObject) -> SerializedObject {
    let mut map = Map::new();
    map.insert(KEY_TYPE.into(), object.kind().type_name().into());
    map.insert(KEY_ID.into(), object.id().as_str().into());

    match &object.shape {
        Shape::Rectangle(rect) => {
            insert_box(&mut map, rect.position.x, rect.position.y, rect.width, rect.height);
            map.insert(KEY_RX.into(), rect.rx.into());
            map.insert(KEY_RY.into(), rect.ry.into());
        }
        Shape::Ellipse(ellipse) => {
            insert_box(
                &mut map,
                ellipse.center.x - ellipse.radius_x,
                ellipse.center.y - ellipse.radius_y,
                ellipse.radius_x * 2.0,
                ellipse.radius_y * 2.0,
            );
            map.insert(KEY_RX.into(), ellipse.radius_x.into());
            map.insert(KEY_RY.into(), ellipse.radius_y.into());
        }
        Shape::Line(line) => {
            insert_box(
                &mut map,
                line.start.x.min(line.end.x),
                line.start.y.min(line.end.y),
                (line.end.x - line.start.x).abs(),
                (line.end.y - line.start.y).abs(),
            );
            map.insert(KEY_X1.into(), line.start.x.into());
            map.insert(KEY_Y1.into(), line.start.y.into());
            map.insert(KEY_X2.into(), line.end.x.into());
            map.insert(KEY_Y2.into(), line.end.y.into());
        }
        Shape::TextFrame(frame) => {
            insert_box(&mut map, frame.position.x, frame.position.y, frame.width, frame.height);
            map.insert(KEY_TEXT.into(), frame.content.clone().into());
            map.insert(KEY_FONT_SIZE.into(), frame.font_size.into());
            map.insert(KEY_FONT_FAMILY.into(), frame.font_family.clone().into());
            let linked: Vec<Value> = frame
                .linked_object_ids
                .iter()
                .map(|id| Value::from(id.as_str()))
                .collect();
            map.insert(KEY_LINKED_OBJECT_IDS.into(), Value::Array(linked));
        }
        Shape::Image(image) => {
            insert_box(&mut map, image.position.x, image.position.y, image.width, image.height);
            map.insert(KEY_SRC.into(), image.src.clone().into());
        }
        Shape::Polygon(polygon) => {
            let bounds = object.shape.bounds();
            insert_box(&mut map, bounds.x0, bounds.y0, bounds.width(), bounds.height());
            let points: Vec<Value> = polygon
                .points
                .iter()
                .map(|p| json!({ "x": p.x, "y": p.y }))
                .collect();
            map.insert(KEY_POINTS.into(), Value::Array(points));
        }
        Shape::Group(group) => {
            let bounds = object.shape.bounds();
            insert_box(&mut map, bounds.x0, bounds.y0, bounds.width(), bounds.height());
            let children: Vec<Value> = group
                .children
                .iter()
                .map(|child| encode_object(child).0)
                .collect();
            map.insert(KEY_OBJECTS.into(), Value::Array(children));
        }
    }

    map.insert(KEY_ANGLE.into(), object.placement.angle.into());
    map.insert(KEY_SCALE_X.into(), object.placement.scale_x.into());
    map.insert(KEY_SCALE_Y.into(), object.placement.scale_y.into());
    insert_style(&mut map, &object.style);

    if let Some(master) = object.master() {
        map.insert(KEY_FROM_MASTER.into(), true.into());
        map.insert(KEY_MASTER_ID.into(), master.master_id.clone().into());
        map.insert(
            KEY_MASTER_OBJECT_ID.into(),
            master.master_object_id.clone().into(),
        );
        map.insert(KEY_OVERRIDABLE.into(), master.overridable.into());
    }

    SerializedObject::new(map)
}

fn insert_box(map: &mut Map<String, Value>, left: f64, top: f64, width: f64, height: f64) {
    map.insert(KEY_LEFT.into(), left.into());
    map.insert(KEY_TOP.into(), top.into());
    map.insert(KEY_WIDTH.into(), width.into());
    map.insert(KEY_HEIGHT.into(), height.into());
}

fn insert_style(map: &mut Map<String, Value>, style: &ShapeStyle) {
    map.insert(KEY_FILL.into(), color_value(style.fill));
    map.insert(KEY_STROKE.into(), color_value(style.stroke));
    map.insert(KEY_STROKE_WIDTH.into(), style.stroke_width.into());
    map.insert(KEY_OPACITY.into(), style.opacity.into());
}

fn color_value(color: Option<SerializableColor>) -> Value {
    color.map_or(Value::Null, |c| Value::String(c.to_css()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{MasterLink, ObjectId};
    use crate::shapes::{Line, Rectangle, TextFrame};
    use kurbo::Point;

    #[test]
    fn test_encode_rectangle_fields() {
        let obj = CanvasObject::new(Shape::Rectangle(Rectangle::new(
            Point::new(10.0, 20.0),
            30.0,
            40.0,
        )))
        .with_id("r1");
        let encoded = encode_object(&obj);
        assert_eq!(encoded.type_name(), Some("rect"));
        assert_eq!(encoded.id(), Some("r1"));
        assert_eq!(encoded.get_f64(KEY_LEFT), Some(10.0));
        assert_eq!(encoded.get_f64(KEY_HEIGHT), Some(40.0));
        assert_eq!(encoded.get_str(KEY_FILL), Some("#cccccc"));
        assert!(encoded.get(KEY_STROKE).unwrap().is_null());
        assert!(encoded.get(KEY_FROM_MASTER).is_none());
    }

    #[test]
    fn test_encode_master_fields() {
        let obj = CanvasObject::new(Shape::Line(Line::new(Point::ZERO, Point::new(5.0, 5.0))))
            .into_master_instance(
                ObjectId::from("p:m:obj-1"),
                MasterLink {
                    master_id: "m".into(),
                    master_object_id: "obj-1".into(),
                    overridable: false,
                },
            );
        let encoded = encode_object(&obj);
        assert_eq!(encoded.get_bool(KEY_FROM_MASTER), Some(true));
        assert_eq!(encoded.get_str(KEY_MASTER_ID), Some("m"));
        assert_eq!(encoded.master_object_id(), Some("obj-1"));
        assert_eq!(encoded.get_bool(KEY_OVERRIDABLE), Some(false));
    }

    #[test]
    fn test_encode_linked_ids() {
        let mut frame = TextFrame::new(Point::ZERO, 100.0, 50.0, "story");
        frame.linked_object_ids = vec![ObjectId::from("t2"), ObjectId::from("t3")];
        let encoded = encode_object(&CanvasObject::new(Shape::TextFrame(frame)));
        assert_eq!(
            encoded.get(KEY_LINKED_OBJECT_IDS),
            Some(&json!(["t2", "t3"]))
        );
        assert_eq!(encoded.get_str(KEY_TEXT), Some("story"));
    }

    #[test]
    fn test_serialize_assigns_missing_ids() {
        let mut live = LiveObjectSet::new();
        live.insert(
            CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::ZERO, 1.0, 1.0))).with_id("kept"),
        )
        .unwrap();
        live.insert(
            CanvasObject::new(Shape::Rectangle(Rectangle::new(Point::ZERO, 2.0, 2.0))).with_id(""),
        )
        .unwrap();

        let snapshot = serialize(&mut live, "white");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.objects[0].id(), Some("kept"));
        let assigned = snapshot.objects[1].id().unwrap();
        assert!(!assigned.trim().is_empty());
        assert!(live.contains(&ObjectId::from(assigned)));
        assert!(live.ids().all(|id| !id.is_missing()));
        assert_eq!(snapshot.background, "white");
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }
}
