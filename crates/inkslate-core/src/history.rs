//! Bounded undo/redo over whole-canvas stroke snapshots.

use crate::config::OrphanPolicy;
use crate::layer::{Layer, LayerId, LayerManager};
use crate::recognition::{TextAnchor, TextOverlay};
use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Flat copy of every stroke across every layer. Each stroke carries its
/// owning layer id, which is enough to rebuild per-layer contents.
///
/// Recognized texts are not copied, only their anchors, so a text that
/// moved along with its strokes moves back with them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    pub strokes: Vec<Stroke>,
    #[serde(default)]
    pub text_anchors: Vec<TextAnchor>,
}

impl CanvasSnapshot {
    /// Copy the current stroke state.
    pub fn capture(layers: &LayerManager, overlay: &TextOverlay) -> Self {
        let strokes = layers
            .layers()
            .iter()
            .flat_map(|layer| {
                layer.strokes.iter().cloned().map(move |mut stroke| {
                    stroke.layer_id = layer.id();
                    stroke
                })
            })
            .collect();
        Self {
            strokes,
            text_anchors: overlay.anchors(),
        }
    }

    /// Replace every layer's strokes with the snapshot contents and move
    /// texts back to their recorded anchors.
    ///
    /// Strokes whose layer no longer exists are handled per `policy`.
    /// Returns the number of strokes dropped.
    pub fn restore(self, layers: &mut LayerManager, overlay: &mut TextOverlay, policy: OrphanPolicy) -> usize {
        overlay.restore_anchors(&self.text_anchors);
        for layer in layers.layers_mut() {
            layer.strokes.clear();
        }
        let mut dropped = 0;
        for stroke in self.strokes {
            let layer_id = stroke.layer_id;
            if !layers.contains(layer_id) {
                match policy {
                    OrphanPolicy::Drop => {
                        dropped += 1;
                        continue;
                    }
                    OrphanPolicy::Recreate => {
                        log::info!("Recreating deleted layer {} for restored strokes", layer_id);
                        layers.insert_layer(Layer::new(layer_id, placeholder_name(layer_id), true));
                    }
                }
            }
            if let Some(layer) = layers.layer_mut(layer_id) {
                layer.strokes.push(stroke);
            }
        }
        if dropped > 0 {
            log::warn!("Dropped {} strokes whose layer no longer exists", dropped);
        }
        dropped
    }
}

fn placeholder_name(id: LayerId) -> String {
    format!("Layer {id}")
}

/// Linear undo/redo history with a bounded undo stack.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<CanvasSnapshot>,
    redo_stack: Vec<CanvasSnapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot the current state before a destructive change.
    /// Clears the redo stack.
    pub fn save(&mut self, layers: &LayerManager, overlay: &TextOverlay) {
        self.push_undo(CanvasSnapshot::capture(layers, overlay));
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, snapshot: CanvasSnapshot) {
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
    }

    /// Drop the most recent snapshot without restoring it. Used when the
    /// change it guarded never happened (cancelled gesture).
    pub fn discard_last(&mut self) -> Option<CanvasSnapshot> {
        self.undo_stack.pop_back()
    }

    /// Restore the previous state. Returns false when there is nothing to undo.
    pub fn undo(&mut self, layers: &mut LayerManager, overlay: &mut TextOverlay, policy: OrphanPolicy) -> bool {
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        self.redo_stack.push(CanvasSnapshot::capture(layers, overlay));
        snapshot.restore(layers, overlay, policy);
        true
    }

    /// Re-apply an undone state. Returns false when there is nothing to redo.
    pub fn redo(&mut self, layers: &mut LayerManager, overlay: &mut TextOverlay, policy: OrphanPolicy) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.push_undo(CanvasSnapshot::capture(layers, overlay));
        snapshot.restore(layers, overlay, policy);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
