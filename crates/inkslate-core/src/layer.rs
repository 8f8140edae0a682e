//! Layer storage for strokes.

use crate::stroke::{Stroke, StrokeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a layer. Sequential, starting at 1.
pub type LayerId = u32;

/// Layer management errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Cannot remove the last remaining layer")]
    LastLayer,
    #[error("Layer not found: {0}")]
    UnknownLayer(LayerId),
}

/// A named, independently visible list of strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub name: String,
    pub visible: bool,
    /// Reserved; drawing does not check it.
    pub locked: bool,
    /// Strokes in commit order.
    pub strokes: Vec<Stroke>,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, visible: bool) -> Self {
        Self {
            id,
            name: name.into(),
            visible,
            locked: false,
            strokes: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Find a stroke by id.
    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id() == id)
    }

    /// Remove a stroke by id.
    pub fn remove_stroke(&mut self, id: StrokeId) -> Option<Stroke> {
        let index = self.strokes.iter().position(|s| s.id() == id)?;
        Some(self.strokes.remove(index))
    }
}

/// Ordered collection of layers plus the current-layer pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerManager {
    /// Layers in creation order (oldest first).
    layers: Vec<Layer>,
    current: Option<LayerId>,
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManager {
    /// Create a manager with no layers.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            current: None,
        }
    }

    /// Create a manager holding one visible layer.
    pub fn with_default_layer(name: impl Into<String>) -> Self {
        let mut manager = Self::new();
        manager.add_layer(name, true);
        manager
    }

    /// Append a new layer with id `max + 1` and make it current.
    pub fn add_layer(&mut self, name: impl Into<String>, visible: bool) -> &Layer {
        let id = self.layers.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        let layer = Layer::new(id, name, visible);
        log::info!("Added layer {} ({:?})", id, layer.name);
        self.layers.push(layer);
        self.current = Some(id);
        &self.layers[self.layers.len() - 1]
    }

    /// Insert a layer with a given id, keeping creation order by id.
    /// Used when restoring strokes of a deleted layer.
    pub(crate) fn insert_layer(&mut self, layer: Layer) {
        let index = self
            .layers
            .iter()
            .position(|l| l.id > layer.id)
            .unwrap_or(self.layers.len());
        self.layers.insert(index, layer);
        if self.current.is_none() {
            self.current = self.layers.last().map(|l| l.id);
        }
    }

    /// Remove a layer. Removing the last remaining layer is rejected.
    ///
    /// If the removed layer was current, the last remaining layer becomes current.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, LayerError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        if self.layers.len() == 1 {
            return Err(LayerError::LastLayer);
        }
        let removed = self.layers.remove(index);
        if self.current == Some(id) {
            self.select_last();
        }
        log::info!("Removed layer {} ({} strokes)", id, removed.strokes.len());
        Ok(removed)
    }

    /// Flip a layer's visibility. Returns the new state.
    pub fn toggle_visibility(&mut self, id: LayerId) -> Result<bool, LayerError> {
        let layer = self.layer_mut(id).ok_or(LayerError::UnknownLayer(id))?;
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }

    /// Set the lock flag on a layer.
    pub fn set_locked(&mut self, id: LayerId, locked: bool) -> Result<(), LayerError> {
        self.layer_mut(id).ok_or(LayerError::UnknownLayer(id))?.locked = locked;
        Ok(())
    }

    /// Rename a layer.
    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), LayerError> {
        self.layer_mut(id).ok_or(LayerError::UnknownLayer(id))?.name = name.into();
        Ok(())
    }

    /// Make a layer current.
    pub fn set_current(&mut self, id: LayerId) -> Result<(), LayerError> {
        if !self.contains(id) {
            return Err(LayerError::UnknownLayer(id));
        }
        self.current = Some(id);
        Ok(())
    }

    /// Make the topmost layer current. Leaves no current layer when empty.
    pub fn select_last(&mut self) -> Option<LayerId> {
        self.current = self.layers.last().map(|l| l.id);
        self.current
    }

    pub fn current_id(&self) -> Option<LayerId> {
        self.current
    }

    pub fn current(&self) -> Option<&Layer> {
        self.current.and_then(|id| self.layer(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Layer> {
        let id = self.current?;
        self.layer_mut(id)
    }

    /// All layers in creation order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of strokes across all layers.
    pub fn stroke_count(&self) -> usize {
        self.layers.iter().map(|l| l.strokes.len()).sum()
    }

    /// Find a stroke in any layer.
    pub fn find_stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.layers.iter().find_map(|l| l.stroke(id))
    }

    /// Find a stroke in any layer, mutably.
    pub fn find_stroke_mut(&mut self, id: StrokeId) -> Option<&mut Stroke> {
        self.layers
            .iter_mut()
            .find_map(|l| l.strokes.iter_mut().find(|s| s.id() == id))
    }

    /// Remove a stroke from whichever layer holds it.
    pub fn remove_stroke(&mut self, id: StrokeId) -> Option<Stroke> {
        self.layers.iter_mut().find_map(|l| l.remove_stroke(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::InkStyle;
    use kurbo::Point;

    #[test]
    fn test_add_layer_sets_current() {
        let mut layers = LayerManager::new();
        assert!(layers.current().is_none());
        let id = layers.add_layer("Layer 1", true).id();
        assert_eq!(id, 1);
        assert_eq!(layers.current_id(), Some(1));
        let id = layers.add_layer("Layer 2", true).id();
        assert_eq!(id, 2);
        assert_eq!(layers.current_id(), Some(2));
    }

    #[test]
    fn test_ids_are_max_plus_one() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        layers.add_layer("Layer 2", true);
        layers.add_layer("Layer 3", true);
        layers.remove_layer(2).unwrap();
        // Not `len + 1`, which would collide with layer 3.
        assert_eq!(layers.add_layer("Layer 4", true).id(), 4);
    }

    #[test]
    fn test_remove_current_falls_back_to_last() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        layers.add_layer("Layer 2", true);
        layers.add_layer("Layer 3", true);
        layers.set_current(2).unwrap();
        layers.remove_layer(2).unwrap();
        assert_eq!(layers.current_id(), Some(3));

        layers.remove_layer(3).unwrap();
        assert_eq!(layers.current_id(), Some(1));
    }

    #[test]
    fn test_remove_non_current_keeps_current() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        layers.add_layer("Layer 2", true);
        layers.remove_layer(1).unwrap();
        assert_eq!(layers.current_id(), Some(2));
    }

    #[test]
    fn test_last_layer_cannot_be_removed() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        assert_eq!(layers.remove_layer(1), Err(LayerError::LastLayer));
        assert_eq!(layers.len(), 1);
        assert!(layers.current().is_some());
    }

    #[test]
    fn test_unknown_layer() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        assert_eq!(layers.remove_layer(9).unwrap_err(), LayerError::UnknownLayer(9));
        assert_eq!(layers.toggle_visibility(9), Err(LayerError::UnknownLayer(9)));
        assert_eq!(layers.set_current(9), Err(LayerError::UnknownLayer(9)));
    }

    #[test]
    fn test_toggle_visibility() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        assert_eq!(layers.toggle_visibility(1), Ok(false));
        assert!(!layers.layer(1).unwrap().visible);
        assert_eq!(layers.toggle_visibility(1), Ok(true));
    }

    #[test]
    fn test_rename_and_lock() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        layers.rename(1, "Notes").unwrap();
        layers.set_locked(1, true).unwrap();
        let layer = layers.layer(1).unwrap();
        assert_eq!(layer.name, "Notes");
        assert!(layer.locked);
    }

    #[test]
    fn test_find_and_remove_stroke() {
        let mut layers = LayerManager::with_default_layer("Layer 1");
        layers.add_layer("Layer 2", true);
        let stroke = Stroke::from_points(&[Point::ZERO, Point::new(5.0, 5.0)], InkStyle::pen(2.0), 1);
        let id = stroke.id();
        layers.layer_mut(1).unwrap().strokes.push(stroke);

        assert!(layers.find_stroke(id).is_some());
        assert_eq!(layers.stroke_count(), 1);
        assert!(layers.remove_stroke(id).is_some());
        assert!(layers.find_stroke(id).is_none());
        assert_eq!(layers.stroke_count(), 0);
    }

    #[test]
    fn test_select_last() {
        let mut layers = LayerManager::new();
        assert_eq!(layers.select_last(), None);
        layers.add_layer("Layer 1", true);
        layers.add_layer("Layer 2", true);
        layers.set_current(1).unwrap();
        assert_eq!(layers.select_last(), Some(2));
        assert_eq!(layers.current_id(), Some(2));
    }
}
