//! Page snapshots: the durable form of a page's live objects.
//!
//! Encoding is typed; decoding works on loosely-typed JSON so that one bad
//! object degrades or gets skipped instead of failing the whole page.

mod decode;
mod encode;

pub use decode::{ObjectError, ReconstructError, Reconstruction, decode_object, reconstruct, reconstruct_objects};
pub use encode::{encode_object, encode_objects, serialize};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1";

/// Background used when a snapshot carries none.
pub const DEFAULT_BACKGROUND: &str = "white";

// Common keys
pub(crate) const KEY_TYPE: &str = "type";
pub(crate) const KEY_ID: &str = "id";
pub(crate) const KEY_LEFT: &str = "left";
pub(crate) const KEY_TOP: &str = "top";
pub(crate) const KEY_WIDTH: &str = "width";
pub(crate) const KEY_HEIGHT: &str = "height";
pub(crate) const KEY_ANGLE: &str = "angle";
pub(crate) const KEY_SCALE_X: &str = "scaleX";
pub(crate) const KEY_SCALE_Y: &str = "scaleY";

// Style keys
pub(crate) const KEY_FILL: &str = "fill";
pub(crate) const KEY_STROKE: &str = "stroke";
pub(crate) const KEY_STROKE_WIDTH: &str = "strokeWidth";
pub(crate) const KEY_OPACITY: &str = "opacity";

// Rectangle / ellipse keys
pub(crate) const KEY_RX: &str = "rx";
pub(crate) const KEY_RY: &str = "ry";
pub(crate) const KEY_RADIUS: &str = "radius";

// Line keys
pub(crate) const KEY_X1: &str = "x1";
pub(crate) const KEY_Y1: &str = "y1";
pub(crate) const KEY_X2: &str = "x2";
pub(crate) const KEY_Y2: &str = "y2";

// Polygon keys
pub(crate) const KEY_POINTS: &str = "points";

// Text keys
pub(crate) const KEY_TEXT: &str = "text";
pub(crate) const KEY_FONT_SIZE: &str = "fontSize";
pub(crate) const KEY_FONT_FAMILY: &str = "fontFamily";

// Image keys
pub(crate) const KEY_SRC: &str = "src";

// Group keys
pub(crate) const KEY_OBJECTS: &str = "objects";

// Allow-listed custom keys
pub(crate) const KEY_LINKED_OBJECT_IDS: &str = "linkedObjectIds";
pub(crate) const KEY_FROM_MASTER: &str = "fromMaster";
pub(crate) const KEY_MASTER_ID: &str = "masterId";
pub(crate) const KEY_MASTER_OBJECT_ID: &str = "masterObjectId";
pub(crate) const KEY_OVERRIDABLE: &str = "overridable";

/// Custom fields carried through serialization besides each kind's own fields.
pub const CUSTOM_FIELDS: [&str; 6] = [
    KEY_ID,
    KEY_LINKED_OBJECT_IDS,
    KEY_FROM_MASTER,
    KEY_MASTER_ID,
    KEY_MASTER_OBJECT_ID,
    KEY_OVERRIDABLE,
];

/// One object in a snapshot: a JSON value with a `type` discriminator.
///
/// Kept as a raw value so that malformed entries survive parsing and are only
/// rejected, individually, during reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedObject(Value);

impl SerializedObject {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub(crate) fn as_map(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `type` discriminator, if present and a string.
    pub fn type_name(&self) -> Option<&str> {
        self.get_str(KEY_TYPE)
    }

    /// The serialized object id, if present and non-blank.
    pub fn id(&self) -> Option<&str> {
        self.get_str(KEY_ID).filter(|id| !id.trim().is_empty())
    }

    /// The `masterObjectId` field, if present and non-blank.
    pub fn master_object_id(&self) -> Option<&str> {
        self.get_str(KEY_MASTER_OBJECT_ID)
            .filter(|id| !id.trim().is_empty())
    }

    pub(crate) fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Numeric field; numeric strings are accepted, non-finite values are not.
    pub(crate) fn get_f64(&self, key: &str) -> Option<f64> {
        let value = match self.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub(crate) fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_f64(key).unwrap_or(default)
    }

    pub(crate) fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Set a field, if this is a JSON object.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value.into());
        }
    }
}

/// A page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub objects: Vec<SerializedObject>,
    pub background: String,
}

impl Snapshot {
    /// A snapshot with no objects.
    pub fn empty(background: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            objects: Vec::new(),
            background: background.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored snapshot without ever failing.
    ///
    /// Unreadable JSON yields an empty snapshot. A bare array is read as the
    /// object list of an unversioned record. Missing fields take defaults.
    pub fn parse_lenient(json: &str) -> Self {
        if json.trim().is_empty() {
            return Self::empty(DEFAULT_BACKGROUND);
        }
        match serde_json::from_str::<Value>(json) {
            Ok(value) => Self::from_value_lenient(value),
            Err(e) => {
                log::error!("Unreadable page snapshot, treating as empty: {}", e);
                Self::empty(DEFAULT_BACKGROUND)
            }
        }
    }

    /// Lenient conversion from an already-parsed JSON value.
    pub fn from_value_lenient(value: Value) -> Self {
        match value {
            Value::Array(items) => Self {
                version: SNAPSHOT_VERSION.to_string(),
                objects: items.into_iter().map(SerializedObject).collect(),
                background: DEFAULT_BACKGROUND.to_string(),
            },
            Value::Object(mut map) => {
                let version = match map.remove("version") {
                    Some(Value::String(v)) => v,
                    Some(Value::Number(n)) => n.to_string(),
                    _ => SNAPSHOT_VERSION.to_string(),
                };
                let background = match map.remove("background") {
                    Some(Value::String(bg)) if !bg.trim().is_empty() => bg,
                    _ => DEFAULT_BACKGROUND.to_string(),
                };
                let objects = match map.remove(KEY_OBJECTS) {
                    Some(Value::Array(items)) => items.into_iter().map(SerializedObject).collect(),
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        log::error!("Snapshot objects is not an array ({}), ignoring", type_of(&other));
                        Vec::new()
                    }
                };
                Self {
                    version,
                    objects,
                    background,
                }
            }
            other => {
                log::error!("Snapshot is a JSON {}, treating as empty", type_of(&other));
                Self::empty(DEFAULT_BACKGROUND)
            }
        }
    }
}

pub(crate) fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
