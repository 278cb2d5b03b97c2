//! Snapshot records to live objects.
//!
//! Every shape kind has its own constructor reading only its field subset. Missing
//! or corrupt fields fall back to the defaults below instead of failing the object.

use super::*;
use crate::object::{CanvasObject, MasterLink, ObjectId, Placement};
use crate::shapes::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, Ellipse, Group, Image, Line, Polygon, Rectangle,
    SerializableColor, Shape, ShapeKind, ShapeStyle, TextFrame,
};
use kurbo::{Point, Rect};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

// Geometry defaults
const DEFAULT_WIDTH: f64 = 100.0;
const DEFAULT_HEIGHT: f64 = 100.0;
const DEFAULT_TEXT_WIDTH: f64 = 200.0;
const DEFAULT_TEXT_HEIGHT: f64 = 40.0;

/// Deepest group nesting accepted before the rest is dropped.
const MAX_GROUP_DEPTH: usize = 32;

/// Why one snapshot entry could not be turned into an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("Snapshot entry is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("Snapshot entry has no type")]
    MissingType,
    #[error("Unknown object type: {0}")]
    UnknownType(String),
    #[error("Group nesting deeper than {0} levels")]
    TooDeep(usize),
}

/// A skipped snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectError {
    /// Position of the entry in its object list.
    pub index: usize,
    /// Serialized id of the entry, when it had one.
    pub id: Option<String>,
    pub error: ReconstructError,
}

/// Result of reconstructing a snapshot: what could be rebuilt, and what was skipped.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Objects in paint order, with unique ids.
    pub objects: Vec<CanvasObject>,
    pub background: String,
    pub errors: Vec<ObjectError>,
}

impl Reconstruction {
    /// Whether every entry was reconstructed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reconstruct a page snapshot. Never fails; bad entries are logged and skipped.
pub fn reconstruct(snapshot: &Snapshot) -> Reconstruction {
    let (objects, errors) = reconstruct_objects(&snapshot.objects);
    let background = if snapshot.background.trim().is_empty() {
        DEFAULT_BACKGROUND.to_string()
    } else {
        snapshot.background.clone()
    };
    if !errors.is_empty() {
        log::warn!(
            "Reconstructed {} of {} objects ({} skipped)",
            objects.len(),
            snapshot.objects.len(),
            errors.len()
        );
    }
    Reconstruction {
        objects,
        background,
        errors,
    }
}

/// Reconstruct a list of serialized objects.
///
/// Objects with a missing id, or an id already used earlier in the list, are given
/// a fresh id so the result can populate a live set as-is.
pub fn reconstruct_objects(
    entries: &[SerializedObject],
) -> (Vec<CanvasObject>, Vec<ObjectError>) {
    decode_list(entries, 0)
}

fn decode_list(
    entries: &[SerializedObject],
    depth: usize,
) -> (Vec<CanvasObject>, Vec<ObjectError>) {
    let mut objects = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        match decode_at_depth(entry, depth) {
            Ok(mut object) => {
                if seen.contains(&object.id) {
                    let fresh = ObjectId::new();
                    log::warn!("Duplicate object id {} in snapshot, re-keyed as {}", object.id, fresh);
                    object.id = fresh;
                }
                seen.insert(object.id.clone());
                objects.push(object);
            }
            Err(error) => {
                log::error!("Skipping snapshot object #{}: {}", index, error);
                errors.push(ObjectError {
                    index,
                    id: entry.id().map(str::to_string),
                    error,
                });
            }
        }
    }

    (objects, errors)
}

/// Reconstruct one serialized object.
pub fn decode_object(entry: &SerializedObject) -> Result<CanvasObject, ReconstructError> {
    decode_at_depth(entry, 0)
}

fn decode_at_depth(entry: &SerializedObject, depth: usize) -> Result<CanvasObject, ReconstructError> {
    if entry.as_map().is_none() {
        return Err(ReconstructError::NotAnObject(type_of(entry.as_value())));
    }
    let type_name = entry
        .type_name()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ReconstructError::MissingType)?;
    let kind = ShapeKind::from_type_name(type_name.trim())
        .ok_or_else(|| ReconstructError::UnknownType(type_name.to_string()))?;

    let shape = match kind {
        ShapeKind::Rectangle => rectangle_from(entry),
        ShapeKind::Ellipse => ellipse_from(entry),
        ShapeKind::Line => line_from(entry),
        ShapeKind::TextFrame => text_from(entry),
        ShapeKind::Image => image_from(entry),
        ShapeKind::Polygon => polygon_from(entry),
        ShapeKind::Group => group_from(entry, depth)?,
    };

    let mut object = CanvasObject::new(shape);
    if let Some(id) = entry.id() {
        object.id = ObjectId::from(id);
    }
    object.style = style_from(entry, object.style.clone());
    object.placement = placement_from(entry);
    object.visible = true;

    if entry.get_bool(KEY_FROM_MASTER) == Some(true) {
        let link = master_link_from(entry, object.id.as_str());
        let id = object.id.clone();
        object = object.into_master_instance(id, link);
    }

    Ok(object)
}

fn position_from(entry: &SerializedObject) -> Point {
    Point::new(entry.f64_or(KEY_LEFT, 0.0), entry.f64_or(KEY_TOP, 0.0))
}

/// A size field: finite and non-negative, else the default.
fn size_or(entry: &SerializedObject, key: &str, default: f64) -> f64 {
    entry.get_f64(key).filter(|v| *v >= 0.0).unwrap_or(default)
}

fn rectangle_from(entry: &SerializedObject) -> Shape {
    let rx = size_or(entry, KEY_RX, 0.0);
    // A lone rx rounds both directions.
    let ry = size_or(entry, KEY_RY, rx);
    Shape::Rectangle(
        Rectangle::new(
            position_from(entry),
            size_or(entry, KEY_WIDTH, DEFAULT_WIDTH),
            size_or(entry, KEY_HEIGHT, DEFAULT_HEIGHT),
        )
        .rounded(rx, ry),
    )
}

fn ellipse_from(entry: &SerializedObject) -> Shape {
    let radius = entry.get_f64(KEY_RADIUS).filter(|r| *r >= 0.0);
    let radius_x = entry
        .get_f64(KEY_RX)
        .filter(|r| *r >= 0.0)
        .or(radius)
        .or_else(|| entry.get_f64(KEY_WIDTH).filter(|w| *w >= 0.0).map(|w| w / 2.0))
        .unwrap_or(DEFAULT_WIDTH / 2.0);
    let radius_y = entry
        .get_f64(KEY_RY)
        .filter(|r| *r >= 0.0)
        .or(radius)
        .or_else(|| entry.get_f64(KEY_HEIGHT).filter(|h| *h >= 0.0).map(|h| h / 2.0))
        .unwrap_or(DEFAULT_HEIGHT / 2.0);
    let origin = position_from(entry);
    Shape::Ellipse(Ellipse::new(
        Point::new(origin.x + radius_x, origin.y + radius_y),
        radius_x,
        radius_y,
    ))
}

fn line_from(entry: &SerializedObject) -> Shape {
    let endpoints = (
        entry.get_f64(KEY_X1),
        entry.get_f64(KEY_Y1),
        entry.get_f64(KEY_X2),
        entry.get_f64(KEY_Y2),
    );
    if let (Some(x1), Some(y1), Some(x2), Some(y2)) = endpoints {
        return Shape::Line(Line::new(Point::new(x1, y1), Point::new(x2, y2)));
    }
    // No usable endpoints: a line across the bounding box.
    let start = position_from(entry);
    let end = Point::new(
        start.x + entry.f64_or(KEY_WIDTH, DEFAULT_WIDTH),
        start.y + entry.f64_or(KEY_HEIGHT, 0.0),
    );
    Shape::Line(Line::new(start, end))
}

fn text_from(entry: &SerializedObject) -> Shape {
    let mut frame = TextFrame::new(
        position_from(entry),
        size_or(entry, KEY_WIDTH, DEFAULT_TEXT_WIDTH),
        size_or(entry, KEY_HEIGHT, DEFAULT_TEXT_HEIGHT),
        entry.get_str(KEY_TEXT).unwrap_or_default(),
    );
    frame.font_size = entry
        .get_f64(KEY_FONT_SIZE)
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE);
    frame.font_family = entry
        .get_str(KEY_FONT_FAMILY)
        .filter(|family| !family.trim().is_empty())
        .unwrap_or(DEFAULT_FONT_FAMILY)
        .to_string();
    frame.linked_object_ids = linked_ids_from(entry);
    Shape::TextFrame(frame)
}

fn linked_ids_from(entry: &SerializedObject) -> Vec<ObjectId> {
    match entry.get(KEY_LINKED_OBJECT_IDS) {
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .map(ObjectId::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn image_from(entry: &SerializedObject) -> Shape {
    let src = entry.get_str(KEY_SRC).unwrap_or_default();
    let image = Image::new(
        position_from(entry),
        size_or(entry, KEY_WIDTH, DEFAULT_WIDTH),
        size_or(entry, KEY_HEIGHT, DEFAULT_HEIGHT),
        src,
    );
    if image.is_placeholder() {
        log::debug!("Image {:?} has no source, using placeholder", entry.id());
    }
    Shape::Image(image)
}

fn polygon_from(entry: &SerializedObject) -> Shape {
    let points: Vec<Point> = match entry.get(KEY_POINTS) {
        Some(Value::Array(items)) => items.iter().filter_map(point_from).collect(),
        _ => Vec::new(),
    };
    if points.len() >= 3 {
        return Shape::Polygon(Polygon::new(points));
    }
    let origin = position_from(entry);
    let bounds = Rect::from_origin_size(
        origin,
        (
            size_or(entry, KEY_WIDTH, DEFAULT_WIDTH),
            size_or(entry, KEY_HEIGHT, DEFAULT_HEIGHT),
        ),
    );
    Shape::Polygon(Polygon::triangle(bounds))
}

/// A point written as `{"x":..,"y":..}` or `[x, y]`.
fn point_from(value: &Value) -> Option<Point> {
    let (x, y) = match value {
        Value::Object(map) => (map.get("x")?.as_f64()?, map.get("y")?.as_f64()?),
        Value::Array(coords) => (coords.first()?.as_f64()?, coords.get(1)?.as_f64()?),
        _ => return None,
    };
    (x.is_finite() && y.is_finite()).then(|| Point::new(x, y))
}

fn group_from(entry: &SerializedObject, depth: usize) -> Result<Shape, ReconstructError> {
    if depth >= MAX_GROUP_DEPTH {
        return Err(ReconstructError::TooDeep(MAX_GROUP_DEPTH));
    }
    let children: Vec<SerializedObject> = match entry.get(KEY_OBJECTS) {
        Some(Value::Array(items)) => items.iter().cloned().map(SerializedObject::from_value).collect(),
        _ => Vec::new(),
    };
    let (objects, errors) = decode_list(&children, depth + 1);
    for error in &errors {
        log::error!("Skipping child #{} of group {:?}: {}", error.index, entry.id(), error.error);
    }
    Ok(Shape::Group(Group::new(objects)))
}

fn color_from(entry: &SerializedObject, key: &str, default: Option<SerializableColor>) -> Option<SerializableColor> {
    match entry.get(key) {
        None => default,
        Some(Value::Null) => None,
        Some(Value::String(css)) => {
            let css = css.trim();
            if css.is_empty() || css.eq_ignore_ascii_case("none") || css.eq_ignore_ascii_case("transparent") {
                return None;
            }
            SerializableColor::parse_css(css).or_else(|| {
                log::warn!("Unreadable {} color {:?}, using default", key, css);
                default
            })
        }
        Some(other) => {
            log::warn!("{} is a JSON {}, using default", key, type_of(other));
            default
        }
    }
}

fn style_from(entry: &SerializedObject, defaults: ShapeStyle) -> ShapeStyle {
    let opacity = match entry.get_f64(KEY_OPACITY) {
        Some(o) if o > 0.0 => o.min(1.0),
        // Invisible or unreadable objects come back fully opaque.
        _ => 1.0,
    };
    ShapeStyle {
        fill: color_from(entry, KEY_FILL, defaults.fill),
        stroke: color_from(entry, KEY_STROKE, defaults.stroke),
        stroke_width: size_or(entry, KEY_STROKE_WIDTH, defaults.stroke_width),
        opacity,
    }
}

fn placement_from(entry: &SerializedObject) -> Placement {
    let scale = |key: &str| entry.get_f64(key).filter(|s| *s > 0.0).unwrap_or(1.0);
    Placement {
        angle: entry.f64_or(KEY_ANGLE, 0.0),
        scale_x: scale(KEY_SCALE_X),
        scale_y: scale(KEY_SCALE_Y),
    }
}

fn master_link_from(entry: &SerializedObject, id: &str) -> MasterLink {
    MasterLink {
        master_id: entry.get_str(KEY_MASTER_ID).unwrap_or_default().to_string(),
        master_object_id: entry.master_object_id().unwrap_or(id).to_string(),
        overridable: entry.get_bool(KEY_OVERRIDABLE).unwrap_or(true),
    }
}
