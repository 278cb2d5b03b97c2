//! Shape definitions for page objects.
//!
//! Shapes carry only their intrinsic geometry. Identity, paint style, transform and
//! master-page metadata live on [`CanvasObject`](crate::object::CanvasObject).

mod ellipse;
mod group;
mod image;
mod line;
mod polygon;
mod rectangle;
mod text;

pub use ellipse::Ellipse;
pub use group::Group;
pub use image::{Image, ImageFormat};
pub use line::Line;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, TextFrame};

use kurbo::{Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Format as a CSS color string (`#rrggbb`, or `rgba(...)` when translucent).
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            let alpha = f64::from(self.a) / 255.0;
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, alpha)
        }
    }

    /// Parse a CSS color string.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`, `rgba(r,g,b,a)`,
    /// `transparent` and a handful of named colors. Returns `None` for anything else.
    pub fn parse_css(color: &str) -> Option<Self> {
        let color = color.trim();
        if let Some(hex) = color.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = color.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        match lower.as_str() {
            "transparent" => Some(Self::transparent()),
            "black" => Some(Self::black()),
            "white" => Some(Self::white()),
            "red" => Some(Self::new(255, 0, 0, 255)),
            "green" => Some(Self::new(0, 128, 0, 255)),
            "blue" => Some(Self::new(0, 0, 255, 255)),
            "gray" | "grey" => Some(Self::new(128, 128, 128, 255)),
            _ => None,
        }
    }
}

fn parse_hex(hex: &str) -> Option<SerializableColor> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            // #rgb -> #rrggbb
            let r = channel(&hex[0..1])? * 17;
            let g = channel(&hex[1..2])? * 17;
            let b = channel(&hex[2..3])? * 17;
            Some(SerializableColor::new(r, g, b, 255))
        }
        6 => Some(SerializableColor::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        )),
        8 => Some(SerializableColor::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<SerializableColor> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    let a = match parts.get(3) {
        Some(alpha) => {
            let alpha: f64 = alpha.parse().ok()?;
            (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Some(SerializableColor::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        a,
    ))
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Paint properties for objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Fill color (None = no fill).
    pub fill: Option<SerializableColor>,
    /// Stroke color (None = no stroke).
    pub stroke: Option<SerializableColor>,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    pub opacity: f64,
}

impl ShapeStyle {
    /// Default style for closed shapes: light gray fill, no stroke.
    pub fn filled() -> Self {
        Self {
            fill: Some(SerializableColor::new(204, 204, 204, 255)),
            stroke: None,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }

    /// Default style for open paths: black 1px stroke.
    pub fn stroked() -> Self {
        Self {
            fill: None,
            stroke: Some(SerializableColor::black()),
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }

    /// Default style for text: black fill.
    pub fn text() -> Self {
        Self {
            fill: Some(SerializableColor::black()),
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }

    /// Get the fill color with opacity applied, for the scene graph.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill.map(|c| self.apply_opacity(c))
    }

    /// Get the stroke color with opacity applied, for the scene graph.
    pub fn stroke_with_opacity(&self) -> Option<Color> {
        self.stroke.map(|c| self.apply_opacity(c))
    }

    fn apply_opacity(&self, color: SerializableColor) -> Color {
        let alpha = (f64::from(color.a) * self.opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(color.r, color.g, color.b, alpha)
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self::filled()
    }
}

/// Common trait for all shape geometries.
pub trait ShapeTrait {
    /// Bounding box in page coordinates, before the object's scale and rotation.
    fn bounds(&self) -> Rect;

    /// Move the geometry by `delta`.
    fn translate(&mut self, delta: Vec2);
}

/// Discriminator for the shape kinds, matching the snapshot `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    TextFrame,
    Image,
    Polygon,
    Group,
}

impl ShapeKind {
    /// Canonical snapshot type name.
    pub fn type_name(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rect",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
            ShapeKind::TextFrame => "textbox",
            ShapeKind::Image => "image",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Group => "group",
        }
    }

    /// Resolve a snapshot type name, including legacy aliases.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rect" | "rectangle" => Some(ShapeKind::Rectangle),
            "ellipse" | "circle" => Some(ShapeKind::Ellipse),
            "line" => Some(ShapeKind::Line),
            "textbox" | "text" | "i-text" => Some(ShapeKind::TextFrame),
            "image" => Some(ShapeKind::Image),
            "polygon" | "polyline" => Some(ShapeKind::Polygon),
            "group" => Some(ShapeKind::Group),
            _ => None,
        }
    }
}

/// Closed set of shape geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Line(Line),
    TextFrame(TextFrame),
    Image(Image),
    Polygon(Polygon),
    Group(Group),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Line(_) => ShapeKind::Line,
            Shape::TextFrame(_) => ShapeKind::TextFrame,
            Shape::Image(_) => ShapeKind::Image,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Group(_) => ShapeKind::Group,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Line(s) => s.bounds(),
            Shape::TextFrame(s) => s.bounds(),
            Shape::Image(s) => s.bounds(),
            Shape::Polygon(s) => s.bounds(),
            Shape::Group(s) => s.bounds(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Rectangle(s) => s.translate(delta),
            Shape::Ellipse(s) => s.translate(delta),
            Shape::Line(s) => s.translate(delta),
            Shape::TextFrame(s) => s.translate(delta),
            Shape::Image(s) => s.translate(delta),
            Shape::Polygon(s) => s.translate(delta),
            Shape::Group(s) => s.translate(delta),
        }
    }

    /// Get the text frame if this shape is one.
    pub fn as_text_frame(&self) -> Option<&TextFrame> {
        match self {
            Shape::TextFrame(t) => Some(t),
            _ => None,
        }
    }

    /// Get the mutable text frame if this shape is one.
    pub fn as_text_frame_mut(&mut self) -> Option<&mut TextFrame> {
        match self {
            Shape::TextFrame(t) => Some(t),
            _ => None,
        }
    }

    /// Get the group if this shape is a group.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }
}
