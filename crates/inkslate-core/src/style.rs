//! Immutable ink styles captured per stroke.

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
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
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

/// How a stroke is composited onto the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InkBlend {
    /// Regular ink.
    #[default]
    Normal,
    /// Eraser ink: clears whatever is under it.
    Clear,
}

impl InkBlend {
    /// Blend mode for renderers.
    pub fn blend_mode(self) -> BlendMode {
        match self {
            InkBlend::Normal => BlendMode::new(Mix::Normal, Compose::SrcOver),
            InkBlend::Clear => BlendMode::new(Mix::Normal, Compose::Clear),
        }
    }
}

/// Style of a committed stroke. A value, never shared: changing the tool
/// settings after a commit cannot affect strokes already stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkStyle {
    pub color: SerializableColor,
    pub width: f64,
    pub blend: InkBlend,
}

impl InkStyle {
    /// Black pen ink of the given width.
    pub fn pen(width: f64) -> Self {
        Self {
            color: SerializableColor::black(),
            width,
            blend: InkBlend::Normal,
        }
    }

    /// Eraser ink of the given width.
    pub fn eraser(width: f64) -> Self {
        Self {
            color: SerializableColor::white(),
            width,
            blend: InkBlend::Clear,
        }
    }

    /// The color as a peniko Color.
    pub fn color(&self) -> Color {
        self.color.into()
    }

    pub fn is_eraser(&self) -> bool {
        self.blend == InkBlend::Clear
    }
}

impl Default for InkStyle {
    fn default() -> Self {
        Self::pen(6.0)
    }
}

/// Font faces offered for recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Typeface {
    #[default]
    Regular,
    Bold,
    Elegant,
    Calligraphy,
}
