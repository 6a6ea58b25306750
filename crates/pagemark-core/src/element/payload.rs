//! Type-specific element payloads.

use kurbo::Point;
use peniko::{BlendMode, Color, Compose, Mix};
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
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Default highlighter yellow.
    pub const fn highlight() -> Self {
        Self::new(255, 221, 0, 255)
    }

    /// The same color with its alpha scaled by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
                255,
            )),
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }
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

/// Stable identifier of a text run within one page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(pub String);

impl FragmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The page fragment a text element was projected from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSource {
    pub fragment_id: FragmentId,
    /// Text as extracted from the page. Never mutated.
    pub original_text: String,
    /// The fragment's text matrix `[a, b, c, d, e, f]` in page space.
    pub transform: [f64; 6],
    pub font_name: String,
    /// Fragment advance width in page units.
    pub width: f64,
    /// Fragment height in page units.
    pub height: f64,
}

/// Text content and its typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
    /// Font size in page units.
    pub font_size: f64,
    pub font_family: String,
    pub color: SerializableColor,
    /// Present when the element edits text that already exists on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TextSource>,
}

impl TextPayload {
    pub fn new(text: impl Into<String>, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font_size,
            font_family: "Helvetica".to_string(),
            color: SerializableColor::black(),
            source: None,
        }
    }

    /// Whether the text differs from the page's original text.
    ///
    /// Always false for text the user added.
    pub fn is_modified(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.original_text != self.text)
    }

    pub fn original_text(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.original_text.as_str())
    }
}

/// Which freehand tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InkTool {
    #[default]
    Pen,
    Highlighter,
}

impl InkTool {
    /// Compositing mode used when the stroke is painted.
    pub fn blend_mode(self) -> BlendMode {
        match self {
            InkTool::Pen => BlendMode::new(Mix::Normal, Compose::SrcOver),
            InkTool::Highlighter => BlendMode::new(Mix::Multiply, Compose::SrcOver),
        }
    }
}

/// A freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPayload {
    /// Stroke points in page space, in drawing order.
    pub path: Vec<Point>,
    pub stroke_color: SerializableColor,
    /// Stroke width in page units.
    pub stroke_width: f64,
    pub tool: InkTool,
}

/// Rectangle and circle styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePayload {
    pub stroke_color: SerializableColor,
    /// Stroke width in page units.
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<SerializableColor>,
}

impl Default for ShapePayload {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 2.0,
            fill_color: None,
        }
    }
}

/// A straight arrow from `start` to `end` (page space).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowPayload {
    pub start: Point,
    pub end: Point,
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
}

/// Encoded image formats accepted for image and uploaded-signature elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Sniff the format from the leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Encoded image bytes (base64 on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub format: ImageFormat,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// How a signature was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Draw,
    Type,
    Upload,
}

/// Signature content, tagged by how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signature_type", content = "signature_data", rename_all = "snake_case")]
pub enum SignaturePayload {
    /// Strokes drawn on a signature pad, normalized to the element bounds (0..1).
    Draw { strokes: Vec<Vec<Point>> },
    /// A typed name rendered in a script font.
    Type { text: String, font_family: String },
    /// An uploaded image of a signature.
    Upload(ImagePayload),
}

impl SignaturePayload {
    pub fn signature_type(&self) -> SignatureType {
        match self {
            SignaturePayload::Draw { .. } => SignatureType::Draw,
            SignaturePayload::Type { .. } => SignatureType::Type,
            SignaturePayload::Upload(_) => SignatureType::Upload,
        }
    }
}

/// A sticky note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotePayload {
    pub text: String,
    pub color: SerializableColor,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
