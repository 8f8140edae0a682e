//! Handwriting recognition boundary and the recognized-text overlay.

use crate::config::CanvasConfig;
use crate::layer::LayerId;
use crate::stroke::{Stroke, StrokeId};
use crate::style::{SerializableColor, Typeface};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Synthetic time step between resampled points.
const SAMPLE_INTERVAL_MS: u64 = 10;

/// Recognition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("Recognition failed: {0}")]
    Failed(String),
    #[error("Recognizer unavailable")]
    Unavailable,
}

/// Boxed future for recognizer calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handwriting recognizer, handed to the canvas at construction.
///
/// The batch is passed by value: recognition works on a snapshot of the
/// points, not on live strokes.
pub trait Recognizer: Send + Sync {
    /// Recognize a batch. `Ok(None)` means nothing was recognized.
    fn recognize(&self, batch: StrokeBatch) -> BoxFuture<'static, Result<Option<String>, RecognitionError>>;
}

/// A resampled point handed to the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub x: f64,
    pub y: f64,
    pub t: u64,
}

/// One stroke as a point sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkTrace {
    pub stroke_id: StrokeId,
    pub points: Vec<TracePoint>,
}

impl InkTrace {
    /// Resample a stroke at fixed arc-length spacing. Timestamps start at the
    /// stroke's first recorded time and advance by a fixed step per sample.
    pub fn from_stroke(stroke: &Stroke, spacing: f64, cap: usize) -> Self {
        let start = stroke.points.first().map(|p| p.t).unwrap_or(0);
        let points = stroke
            .resample(spacing, cap)
            .into_iter()
            .enumerate()
            .map(|(i, p)| TracePoint {
                x: p.x,
                y: p.y,
                t: start + i as u64 * SAMPLE_INTERVAL_MS,
            })
            .collect();
        Self {
            stroke_id: stroke.id(),
            points,
        }
    }
}

/// The unrecognized strokes of one layer, ready for recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    pub layer_id: LayerId,
    pub traces: Vec<InkTrace>,
    /// Combined bounding box of the source strokes.
    pub bounds: Option<Rect>,
}

impl StrokeBatch {
    pub fn from_strokes<'a>(
        layer_id: LayerId,
        strokes: impl IntoIterator<Item = &'a Stroke>,
        config: &CanvasConfig,
    ) -> Self {
        let mut traces = Vec::new();
        let mut bounds: Option<Rect> = None;
        for stroke in strokes {
            traces.push(InkTrace::from_stroke(stroke, config.resample_spacing, config.resample_cap));
            let b = stroke.bounds();
            bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
        }
        Self { layer_id, traces, bounds }
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn stroke_ids(&self) -> impl Iterator<Item = StrokeId> + '_ {
        self.traces.iter().map(|t| t.stroke_id)
    }
}

/// What to render in place of recognized strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
    pub typeface: Typeface,
    /// Overrides the size derived from the stroke bounds.
    pub font_size: Option<f64>,
    pub color: SerializableColor,
}

impl TextRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            typeface: Typeface::default(),
            font_size: None,
            color: SerializableColor::black(),
        }
    }

    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = typeface;
        self
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }
}

/// Where a recognized text sat when an undo snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextAnchor {
    pub id: Uuid,
    pub position: Point,
}

/// Text that replaces a group of strokes on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub id: Uuid,
    pub text: String,
    /// Baseline-left anchor in canvas space.
    pub position: Point,
    pub font_size: f64,
    pub typeface: Typeface,
    pub color: SerializableColor,
    pub layer_id: LayerId,
    /// Strokes this text replaced.
    pub strokes: Vec<StrokeId>,
}

impl RecognizedText {
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn is_associated_with(&self, ids: &HashSet<StrokeId>) -> bool {
        self.strokes.iter().any(|id| ids.contains(id))
    }
}

/// Anchor and font size for text replacing strokes within `bounds`.
pub fn text_anchor(bounds: Option<Rect>, font_size: Option<f64>, config: &CanvasConfig) -> (Point, f64) {
    match bounds {
        Some(b) => {
            let size = font_size.unwrap_or_else(|| config.font_size_range.clamp(b.height()));
            (Point::new(b.x0, b.y0 + size), size)
        }
        None => {
            let size = font_size.unwrap_or(config.default_font_size);
            (Point::new(20.0, size), size)
        }
    }
}

/// Recognized texts plus the set of strokes they consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextOverlay {
    texts: Vec<RecognizedText>,
    recognized: HashSet<StrokeId>,
}

impl TextOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> &[RecognizedText] {
        &self.texts
    }

    pub fn is_recognized(&self, id: StrokeId) -> bool {
        self.recognized.contains(&id)
    }

    /// Add a text and mark its strokes as recognized.
    pub fn insert(&mut self, text: RecognizedText) {
        self.recognized.extend(text.strokes.iter().copied());
        self.texts.push(text);
    }

    /// Move every text tied to one of `ids`.
    pub fn translate_associated(&mut self, ids: &HashSet<StrokeId>, delta: Vec2) {
        for text in self.texts.iter_mut().filter(|t| t.is_associated_with(ids)) {
            text.translate(delta);
        }
    }

    pub fn anchors(&self) -> Vec<TextAnchor> {
        self.texts
            .iter()
            .map(|t| TextAnchor {
                id: t.id,
                position: t.position,
            })
            .collect()
    }

    /// Put texts back at recorded anchors. Texts without an anchor keep
    /// their position.
    pub fn restore_anchors(&mut self, anchors: &[TextAnchor]) {
        for text in &mut self.texts {
            if let Some(anchor) = anchors.iter().find(|a| a.id == text.id) {
                text.position = anchor.position;
            }
        }
    }

    /// Remove every text tied to one of `ids`. Returns how many were removed.
    pub fn remove_associated(&mut self, ids: &HashSet<StrokeId>) -> usize {
        let before = self.texts.len();
        self.texts.retain(|t| !t.is_associated_with(ids));
        before - self.texts.len()
    }

    /// Stop tracking `ids` as recognized.
    pub fn forget(&mut self, ids: &HashSet<StrokeId>) {
        self.recognized.retain(|id| !ids.contains(id));
    }
}

/// Single-shot timer that is re-armed on every schedule call.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms, deadline: None }
    }

    /// Arm the timer to fire `delay_ms` after `now_ms`, replacing any pending deadline.
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true once when the deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
