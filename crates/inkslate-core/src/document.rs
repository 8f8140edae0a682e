//! Serializable canvas document for hosts that persist notes.

use crate::camera::Camera;
use crate::layer::LayerManager;
use crate::recognition::RecognizedText;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Layers, recognized texts and the view, without undo history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    pub layers: LayerManager,
    pub texts: Vec<RecognizedText>,
    pub camera: Camera,
}

impl CanvasDocument {
    pub fn new(layers: LayerManager, texts: Vec<RecognizedText>, camera: Camera) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            layers,
            texts,
            camera,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
