//! inkslate core library
//!
//! Platform-agnostic engine for an infinite handwriting canvas: camera
//! transforms, layered strokes, lasso selection, undo/redo and the
//! recognized-text overlay.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod document;
pub mod history;
pub mod input;
pub mod layer;
pub mod recognition;
pub mod region;
pub mod selection;
pub mod stroke;
pub mod style;
pub mod tools;

pub use camera::{Camera, ImageTransform, image_transform};
pub use canvas::{DisplayItem, DisplayList, InkCanvas};
pub use config::{CanvasConfig, ConfigError, OrphanPolicy};
pub use document::CanvasDocument;
pub use history::{CanvasSnapshot, History};
pub use input::{PointerEvent, PointerPhase};
pub use layer::{Layer, LayerError, LayerId, LayerManager};
pub use recognition::{
    BoxFuture, RecognitionError, RecognizedText, Recognizer, StrokeBatch, TextAnchor, TextOverlay,
    TextRequest,
};
pub use selection::{LassoRegion, LassoShape, LassoState};
pub use stroke::{Stroke, StrokeId, StrokePoint};
pub use style::{InkBlend, InkStyle, SerializableColor, Typeface};
pub use tools::{Tool, pressure_width};
