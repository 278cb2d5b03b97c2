//! Image shape for placed raster images.

use super::ShapeTrait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Image format of the placed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }

    /// Detect the format of an inline `data:` URL by decoding its payload.
    ///
    /// Returns `None` for non-data URLs, non-base64 payloads and unknown formats.
    pub fn sniff_data_url(src: &str) -> Option<Self> {
        let rest = src.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        // Only the first few bytes are needed; 16 base64 chars decode to 12 bytes.
        let prefix: String = payload.chars().take(16).collect();
        match STANDARD.decode(prefix.as_bytes()) {
            Ok(bytes) => Self::from_magic_bytes(&bytes),
            Err(e) => {
                log::warn!("Undecodable image data URL: {}", e);
                None
            }
        }
    }
}

/// A placed image. Pixel decoding is left to the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Image source (URL or `data:` URL), kept verbatim.
    pub src: String,
    /// Format detected from an inline source, if any.
    #[serde(default)]
    pub format: Option<ImageFormat>,
}

impl Image {
    /// Create a new image, sniffing the format of inline sources.
    pub fn new(position: Point, width: f64, height: f64, src: impl Into<String>) -> Self {
        let src = src.into();
        let format = ImageFormat::sniff_data_url(&src);
        Self {
            position,
            width,
            height,
            src,
            format,
        }
    }

    /// Whether the image has no source and renders as a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.src.trim().is_empty()
    }
}

impl ShapeTrait for Image {
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

    const PNG_HEADER: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_magic_bytes() {
        assert_eq!(ImageFormat::from_magic_bytes(&PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_magic_bytes(&[0, 1]), None);
    }

    #[test]
    fn test_sniff_data_url() {
        let src = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        assert_eq!(ImageFormat::sniff_data_url(&src), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff_data_url("https://example.com/a.png"), None);
        assert_eq!(ImageFormat::sniff_data_url("data:image/png,rawbytes"), None);
    }

    #[test]
    fn test_new_image_detects_format() {
        let src = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let image = Image::new(Point::ZERO, 10.0, 10.0, src);
        assert_eq!(image.format, Some(ImageFormat::Png));
        assert!(!image.is_placeholder());
        assert!(Image::new(Point::ZERO, 10.0, 10.0, "").is_placeholder());
    }
}
