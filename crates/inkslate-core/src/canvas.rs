//! The ink canvas engine: pointer handling, commands and rendering output.

use crate::camera::Camera;
use crate::config::CanvasConfig;
use crate::document::CanvasDocument;
use crate::history::History;
use crate::input::{PointerEvent, PointerPhase};
use crate::layer::{LayerError, LayerId, LayerManager};
use crate::recognition::{
    text_anchor, BoxFuture, Debouncer, RecognitionError, RecognizedText, Recognizer, StrokeBatch, TextOverlay,
    TextRequest,
};
use crate::selection::{select_strokes, LassoRegion, LassoShape, LassoState};
use crate::stroke::{Stroke, StrokeId};
use crate::style::{InkStyle, SerializableColor, Typeface};
use crate::tools::{pressure_width, InkBuilder, Tool};
use kurbo::{Affine, BezPath, Point, Size, Vec2};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Called with `(translation, scale)` after every view change.
pub type TransformCallback = Box<dyn FnMut(Vec2, f64)>;
/// Called when the pause after the last stroke has elapsed.
pub type StrokeBatchCallback = Box<dyn FnMut(&StrokeBatch)>;
/// Called with the number of selected strokes when a lasso hit-test finishes.
pub type SelectionCallback = Box<dyn FnMut(usize)>;

/// Name given to the layer every canvas starts with.
const DEFAULT_LAYER_NAME: &str = "Layer 1";

/// What the current pointer gesture is doing.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    /// Pen or eraser stroke in progress.
    Ink(InkBuilder),
    /// Lasso gesture in progress (never `LassoState::Idle`).
    Lasso(LassoState),
    /// View-mode drag, in screen coordinates.
    Pan { last: Point },
}

/// Something to draw, in canvas space.
#[derive(Debug, Clone)]
pub enum DisplayItem<'a> {
    Text(&'a RecognizedText),
    Stroke {
        path: &'a BezPath,
        style: InkStyle,
        selected: bool,
    },
    /// The closed lasso outline.
    Lasso(BezPath),
}

/// Draw commands for one frame. `transform` maps canvas to screen space.
#[derive(Debug, Clone)]
pub struct DisplayList<'a> {
    pub transform: Affine,
    pub items: Vec<DisplayItem<'a>>,
}

/// Infinite handwriting canvas.
///
/// Owns the layers, undo history, selection and recognized-text overlay.
/// All mutation happens synchronously from the host's event thread; the
/// only asynchronous boundary is the recognizer.
pub struct InkCanvas {
    config: CanvasConfig,
    camera: Camera,
    layers: LayerManager,
    history: History,
    overlay: TextOverlay,
    tool: Tool,
    lasso_shape: LassoShape,
    pen_style: InkStyle,
    eraser_size: f64,
    typeface: Typeface,
    pencil_enabled: bool,
    writing_mode: bool,
    gesture: Gesture,
    lasso: Option<LassoRegion>,
    selection: Vec<StrokeId>,
    debouncer: Debouncer,
    last_stroke_end: Option<u64>,
    recognizer: Option<Arc<dyn Recognizer>>,
    on_transform_changed: Option<TransformCallback>,
    on_stroke_batch_ready: Option<StrokeBatchCallback>,
    on_selection_complete: Option<SelectionCallback>,
}

impl Default for InkCanvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl InkCanvas {
    /// Create a canvas with one empty, visible layer.
    pub fn new(config: CanvasConfig) -> Self {
        let pen_size = config.pen_size_range.clamp(config.pen_size);
        let eraser_size = config.eraser_size_range.clamp(config.eraser_size);
        Self {
            camera: Camera::from_config(&config),
            layers: LayerManager::with_default_layer(DEFAULT_LAYER_NAME),
            history: History::new(config.undo_capacity),
            overlay: TextOverlay::new(),
            tool: Tool::default(),
            lasso_shape: LassoShape::default(),
            pen_style: InkStyle::pen(pen_size),
            eraser_size,
            typeface: Typeface::default(),
            pencil_enabled: true,
            writing_mode: true,
            gesture: Gesture::Idle,
            lasso: None,
            selection: Vec::new(),
            debouncer: Debouncer::new(config.pause_threshold_ms),
            last_stroke_end: None,
            recognizer: None,
            on_transform_changed: None,
            on_stroke_batch_ready: None,
            on_selection_complete: None,
            config,
        }
    }

    /// Attach the handwriting recognizer.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn on_transform_changed(&mut self, callback: impl FnMut(Vec2, f64) + 'static) {
        self.on_transform_changed = Some(Box::new(callback));
    }

    pub fn on_stroke_batch_ready(&mut self, callback: impl FnMut(&StrokeBatch) + 'static) {
        self.on_stroke_batch_ready = Some(Box::new(callback));
    }

    pub fn on_selection_complete(&mut self, callback: impl FnMut(usize) + 'static) {
        self.on_selection_complete = Some(Box::new(callback));
    }

    // --- Accessors ---

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn texts(&self) -> &[RecognizedText] {
        self.overlay.texts()
    }

    pub fn is_recognized(&self, id: StrokeId) -> bool {
        self.overlay.is_recognized(id)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn lasso_shape(&self) -> LassoShape {
        self.lasso_shape
    }

    pub fn pen_style(&self) -> InkStyle {
        self.pen_style
    }

    pub fn eraser_size(&self) -> f64 {
        self.eraser_size
    }

    pub fn lasso(&self) -> Option<&LassoRegion> {
        self.lasso.as_ref()
    }

    pub fn selected_strokes(&self) -> &[StrokeId] {
        &self.selection
    }

    /// Commit time of the most recent stroke.
    pub fn last_stroke_end(&self) -> Option<u64> {
        self.last_stroke_end
    }

    /// Whether a recognition check is scheduled.
    pub fn recognition_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    // --- Settings ---

    /// Switch tools. Any gesture in progress is cancelled and the lasso
    /// selection is cleared.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        self.cancel_gesture();
        self.clear_lasso_selection();
        log::debug!("Tool changed: {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
    }

    pub fn set_lasso_shape(&mut self, shape: LassoShape) {
        self.lasso_shape = shape;
    }

    /// Set the base pen width, clamped to the allowed range. Returns the applied width.
    pub fn set_pen_size(&mut self, size: f64) -> f64 {
        self.pen_style.width = self.config.pen_size_range.clamp(size);
        self.pen_style.width
    }

    /// Set the eraser width, clamped to the allowed range. Returns the applied width.
    pub fn set_eraser_size(&mut self, size: f64) -> f64 {
        self.eraser_size = self.config.eraser_size_range.clamp(size);
        self.eraser_size
    }

    pub fn set_pen_color(&mut self, color: SerializableColor) {
        self.pen_style.color = color;
    }

    /// Typeface used by [`InkCanvas::apply_recognition`].
    pub fn set_typeface(&mut self, typeface: Typeface) {
        self.typeface = typeface;
    }

    /// When disabled, pen and eraser gestures are ignored.
    pub fn set_pencil_enabled(&mut self, enabled: bool) {
        self.pencil_enabled = enabled;
    }

    /// In view mode (`false`) single-pointer drags pan instead of drawing.
    pub fn set_writing_mode(&mut self, writing: bool) {
        if writing != self.writing_mode {
            self.cancel_gesture();
            self.writing_mode = writing;
        }
    }

    pub fn is_writing_mode(&self) -> bool {
        self.writing_mode
    }

    // --- View ---

    /// Viewport size change from the host. The first valid size centres the
    /// surface; later sizes never move the view.
    pub fn set_viewport_size(&mut self, size: Size) -> bool {
        let first = !self.camera.is_initialized();
        let changed = self.camera.set_viewport_size(size);
        if changed && first {
            self.notify_transform();
        }
        changed
    }

    /// Pinch zoom: multiply the scale by `factor`, clamped.
    pub fn update_scale(&mut self, factor: f64) {
        self.camera.update_scale(factor);
        self.notify_transform();
    }

    /// Pan the view by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
        self.notify_transform();
    }

    fn notify_transform(&mut self) {
        if let Some(callback) = self.on_transform_changed.as_mut() {
            callback(self.camera.offset, self.camera.scale);
        }
    }

    // --- Pointer input ---

    /// Feed a pointer event. Returns true if the canvas consumed it.
    ///
    /// Multi-pointer events are left to the host's pinch handling.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        if event.is_multi_touch() {
            return false;
        }
        if !self.writing_mode {
            return self.handle_view_drag(event);
        }
        let point = self.camera.to_canvas(event.position);
        match self.tool {
            Tool::Pen => self.handle_pen(event, point),
            Tool::Eraser => self.handle_eraser(event, point),
            Tool::Lasso => self.handle_lasso(event, point),
        }
    }

    fn handle_view_drag(&mut self, event: PointerEvent) -> bool {
        match event.phase {
            PointerPhase::Down => {
                self.gesture = Gesture::Pan { last: event.position };
                true
            }
            PointerPhase::Move => {
                let Gesture::Pan { last } = &mut self.gesture else {
                    return false;
                };
                let delta = event.position - *last;
                *last = event.position;
                self.pan(delta);
                true
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                let was_panning = matches!(self.gesture, Gesture::Pan { .. });
                self.gesture = Gesture::Idle;
                was_panning
            }
        }
    }

    fn handle_pen(&mut self, event: PointerEvent, point: Point) -> bool {
        let width = pressure_width(self.pen_style.width, event.pressure, event.is_stylus);
        if event.phase == PointerPhase::Move {
            if let Gesture::Ink(ink) = &mut self.gesture {
                ink.width = width;
            }
        }
        let style = self.pen_style;
        self.handle_ink(event, point, width, move |width| InkStyle { width, ..style })
    }

    fn handle_eraser(&mut self, event: PointerEvent, point: Point) -> bool {
        self.handle_ink(event, point, self.eraser_size, InkStyle::eraser)
    }

    /// Shared pen/eraser state machine. `style` builds the committed style
    /// from the final width.
    fn handle_ink(&mut self, event: PointerEvent, point: Point, width: f64, style: impl Fn(f64) -> InkStyle) -> bool {
        match event.phase {
            PointerPhase::Down => {
                if !self.pencil_enabled {
                    return false;
                }
                if self.layers.current().is_none() {
                    log::warn!("No current layer, ignoring stroke");
                    return false;
                }
                self.debouncer.cancel();
                self.history.save(&self.layers, &self.overlay);
                self.gesture = Gesture::Ink(InkBuilder::begin(
                    point,
                    event.timestamp_ms,
                    width,
                    self.config.move_threshold,
                ));
                true
            }
            PointerPhase::Move => {
                let Gesture::Ink(ink) = &mut self.gesture else {
                    return false;
                };
                ink.extend(point, event.timestamp_ms);
                true
            }
            PointerPhase::Up => {
                let Gesture::Ink(ink) = std::mem::take(&mut self.gesture) else {
                    return false;
                };
                let Some(layer) = self.layers.current_mut() else {
                    self.history.discard_last();
                    return false;
                };
                let (path, points, width) = ink.finish();
                let stroke = Stroke::new(path, points, style(width), layer.id());
                log::debug!(
                    "Committed stroke {} to layer {} ({} points, width {:.1})",
                    stroke.id(),
                    layer.id(),
                    stroke.points.len(),
                    width
                );
                layer.strokes.push(stroke);
                self.last_stroke_end = Some(event.timestamp_ms);
                self.debouncer.schedule(event.timestamp_ms);
                true
            }
            PointerPhase::Cancel => {
                if !matches!(self.gesture, Gesture::Ink(_)) {
                    return false;
                }
                self.cancel_gesture();
                true
            }
        }
    }

    fn handle_lasso(&mut self, event: PointerEvent, point: Point) -> bool {
        match event.phase {
            PointerPhase::Down => {
                let state = if !self.selection.is_empty() {
                    LassoState::MovingSelection {
                        last: point,
                        moved: false,
                    }
                } else if self
                    .lasso
                    .as_ref()
                    .is_some_and(|lasso| lasso.hit_test(point, self.config.lasso_tolerance))
                {
                    LassoState::MovingRegion { last: point }
                } else {
                    self.history.save(&self.layers, &self.overlay);
                    self.selection.clear();
                    self.lasso = Some(LassoRegion::begin(self.lasso_shape, point));
                    LassoState::DrawingRegion { start: point }
                };
                log::debug!("Lasso gesture: {:?}", state);
                self.gesture = Gesture::Lasso(state);
                true
            }
            PointerPhase::Move => {
                let Gesture::Lasso(state) = self.gesture else {
                    return false;
                };
                if let LassoState::DrawingRegion { start } = state {
                    if let Some(lasso) = self.lasso.as_mut() {
                        lasso.extend(start, point);
                    }
                } else {
                    let state = self.drag_lasso(state, point);
                    self.gesture = Gesture::Lasso(state);
                }
                true
            }
            PointerPhase::Up => {
                let Gesture::Lasso(state) = std::mem::take(&mut self.gesture) else {
                    return false;
                };
                let state = self.drag_lasso(state, point);
                match state {
                    LassoState::DrawingRegion { start } => {
                        if let Some(lasso) = self.lasso.as_mut() {
                            lasso.extend(start, point);
                            lasso.close();
                        }
                        self.refresh_selection();
                    }
                    LassoState::MovingRegion { .. } => self.refresh_selection(),
                    LassoState::MovingSelection { .. } | LassoState::Idle => {}
                }
                true
            }
            PointerPhase::Cancel => {
                if !matches!(self.gesture, Gesture::Lasso(_)) {
                    return false;
                }
                self.cancel_gesture();
                true
            }
        }
    }

    /// Hit-test the current region and report the result. A degenerate
    /// region is discarded instead.
    fn refresh_selection(&mut self) {
        let selected = match self.lasso.as_ref() {
            Some(lasso) if !lasso.is_degenerate() => select_strokes(&self.layers, lasso, &self.config),
            Some(_) => {
                log::warn!("Lasso region is degenerate, clearing selection");
                self.lasso = None;
                Vec::new()
            }
            None => Vec::new(),
        };
        self.selection = selected;
        let count = self.selection.len();
        log::debug!("Selection complete: {} strokes", count);
        if let Some(callback) = self.on_selection_complete.as_mut() {
            callback(count);
        }
    }

    /// Advance a moving lasso state to `point`. A selection move saves its
    /// snapshot on the first real displacement, so a tap leaves no undo step.
    fn drag_lasso(&mut self, mut state: LassoState, point: Point) -> LassoState {
        let Some(delta) = state.drag_to(point) else {
            return state;
        };
        if delta == Vec2::ZERO {
            return state;
        }
        if let LassoState::MovingSelection { moved, .. } = &mut state {
            if !*moved {
                self.history.save(&self.layers, &self.overlay);
                *moved = true;
            }
        }
        self.move_selection(delta);
        state
    }

    /// Translate the region, the selected strokes and their texts.
    fn move_selection(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        if let Some(lasso) = self.lasso.as_mut() {
            lasso.translate(delta);
        }
        if self.selection.is_empty() {
            return;
        }
        for id in &self.selection {
            if let Some(stroke) = self.layers.find_stroke_mut(*id) {
                stroke.translate(delta);
            }
        }
        let ids: HashSet<StrokeId> = self.selection.iter().copied().collect();
        self.overlay.translate_associated(&ids, delta);
    }

    /// Abandon the gesture in progress. An unfinished stroke is discarded
    /// along with the snapshot taken for it; an unfinished region is cleared.
    fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Ink(_) => {
                self.history.discard_last();
                log::debug!("Stroke cancelled");
            }
            Gesture::Lasso(LassoState::DrawingRegion { .. }) => {
                self.history.discard_last();
                self.lasso = None;
                self.selection.clear();
            }
            Gesture::Lasso(_) | Gesture::Pan { .. } | Gesture::Idle => {}
        }
    }

    // --- Commands ---

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.layers, &mut self.overlay, self.config.orphan_policy);
        if undone {
            self.prune_selection();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.layers, &mut self.overlay, self.config.orphan_policy);
        if redone {
            self.prune_selection();
        }
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn prune_selection(&mut self) {
        self.selection.retain(|id| self.layers.find_stroke(*id).is_some());
    }

    /// Remove every stroke of the current layer, with their recognized texts.
    pub fn clear_current_layer(&mut self) {
        let Some(layer_id) = self.layers.current_id() else {
            return;
        };
        self.history.save(&self.layers, &self.overlay);
        let Some(layer) = self.layers.current_mut() else {
            return;
        };
        let ids: HashSet<StrokeId> = layer.strokes.drain(..).map(|s| s.id()).collect();
        self.overlay.remove_associated(&ids);
        self.overlay.forget(&ids);
        self.selection.retain(|id| !ids.contains(id));
        log::info!("Cleared layer {} ({} strokes)", layer_id, ids.len());
    }

    /// Delete the selected strokes. The region is kept. Returns how many
    /// strokes were removed.
    pub fn delete_selected_strokes(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        self.history.save(&self.layers, &self.overlay);
        let ids: HashSet<StrokeId> = self.selection.drain(..).collect();
        let removed = self.remove_strokes(&ids);
        self.overlay.forget(&ids);
        log::debug!("Deleted {} selected strokes", removed);
        removed
    }

    /// Delete the selected strokes and their recognized texts, then drop the
    /// region. Returns how many strokes were removed.
    pub fn delete_lasso(&mut self) -> usize {
        let mut removed = 0;
        if !self.selection.is_empty() {
            self.history.save(&self.layers, &self.overlay);
            let ids: HashSet<StrokeId> = self.selection.drain(..).collect();
            removed = self.remove_strokes(&ids);
            let texts = self.overlay.remove_associated(&ids);
            self.overlay.forget(&ids);
            log::debug!("Deleted lasso: {} strokes, {} texts", removed, texts);
        }
        self.lasso = None;
        if matches!(self.gesture, Gesture::Lasso(_)) {
            self.gesture = Gesture::Idle;
        }
        removed
    }

    fn remove_strokes(&mut self, ids: &HashSet<StrokeId>) -> usize {
        ids.iter().filter(|id| self.layers.remove_stroke(**id).is_some()).count()
    }

    /// Drop the region and selection without touching strokes.
    pub fn clear_lasso_selection(&mut self) {
        self.lasso = None;
        self.selection.clear();
        if matches!(self.gesture, Gesture::Lasso(_)) {
            self.gesture = Gesture::Idle;
        }
    }

    pub fn has_lasso(&self) -> bool {
        self.lasso.is_some()
    }

    pub fn selected_stroke_count(&self) -> usize {
        self.selection.len()
    }

    // --- Layers ---

    /// Add a layer and make it current.
    pub fn add_layer(&mut self, name: impl Into<String>, visible: bool) -> LayerId {
        self.layers.add_layer(name, visible).id()
    }

    /// Remove a layer with its strokes and texts. The last layer cannot be removed.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<(), LayerError> {
        let removed = self.layers.remove_layer(id)?;
        let ids: HashSet<StrokeId> = removed.strokes.iter().map(|s| s.id()).collect();
        self.overlay.remove_associated(&ids);
        self.overlay.forget(&ids);
        self.selection.retain(|s| !ids.contains(s));
        Ok(())
    }

    /// Flip a layer's visibility. Returns the new state.
    pub fn toggle_layer_visibility(&mut self, id: LayerId) -> Result<bool, LayerError> {
        self.layers.toggle_visibility(id)
    }

    pub fn set_current_layer(&mut self, id: LayerId) -> Result<(), LayerError> {
        self.layers.set_current(id)
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), LayerError> {
        self.layers.rename(id, name)
    }

    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) -> Result<(), LayerError> {
        self.layers.set_locked(id, locked)
    }

    // --- Recognition ---

    /// Drive the recognition timer. When the pause after the last stroke has
    /// elapsed, the pending batch is returned and passed to the
    /// stroke-batch-ready callback. Empty batches are not reported.
    pub fn poll(&mut self, now_ms: u64) -> Option<StrokeBatch> {
        if matches!(self.gesture, Gesture::Ink(_)) || !self.debouncer.poll(now_ms) {
            return None;
        }
        let batch = self.pending_strokes();
        if batch.is_empty() {
            return None;
        }
        log::debug!("Stroke batch ready: {} strokes in layer {}", batch.traces.len(), batch.layer_id);
        if let Some(callback) = self.on_stroke_batch_ready.as_mut() {
            callback(&batch);
        }
        Some(batch)
    }

    /// Not-yet-recognized ink strokes of the current layer, resampled.
    pub fn pending_strokes(&self) -> StrokeBatch {
        let Some(layer) = self.layers.current() else {
            return StrokeBatch::from_strokes(0, std::iter::empty(), &self.config);
        };
        let strokes = layer
            .strokes
            .iter()
            .filter(|s| !s.style.is_eraser() && !self.overlay.is_recognized(s.id()));
        StrokeBatch::from_strokes(layer.id(), strokes, &self.config)
    }

    /// Start recognizing `batch` with the attached recognizer. The returned
    /// future does not borrow the canvas.
    pub fn recognition_task(
        &self,
        batch: &StrokeBatch,
    ) -> Option<BoxFuture<'static, Result<Option<String>, RecognitionError>>> {
        let recognizer = self.recognizer.as_ref()?;
        Some(recognizer.recognize(batch.clone()))
    }

    /// Apply a recognizer result. Failures and empty results leave the
    /// canvas untouched.
    pub fn apply_recognition(
        &mut self,
        batch: &StrokeBatch,
        result: Result<Option<String>, RecognitionError>,
    ) -> Option<Uuid> {
        match result {
            Ok(Some(text)) => {
                let request = TextRequest::new(text).with_typeface(self.typeface);
                self.add_recognized_text(batch, request)
            }
            Ok(None) => {
                log::info!("Recognizer returned no text");
                None
            }
            Err(e) => {
                log::warn!("Recognition failed: {}", e);
                None
            }
        }
    }

    /// Replace the batch's strokes with text.
    ///
    /// Only strokes that still exist and are not yet recognized are
    /// consumed; if the batch had strokes but none qualify any more, nothing
    /// happens. Blank text is ignored. A batch without strokes places the
    /// text at the default anchor.
    pub fn add_recognized_text(&mut self, batch: &StrokeBatch, request: TextRequest) -> Option<Uuid> {
        if request.text.trim().is_empty() {
            return None;
        }
        let strokes: Vec<&Stroke> = batch
            .stroke_ids()
            .filter(|id| !self.overlay.is_recognized(*id))
            .filter_map(|id| self.layers.find_stroke(id))
            .collect();
        if strokes.is_empty() && !batch.is_empty() {
            log::warn!("Recognized strokes no longer exist, dropping {:?}", request.text);
            return None;
        }

        let bounds = strokes.iter().map(|s| s.bounds()).reduce(|a, b| a.union(b));
        let (position, font_size) = text_anchor(bounds, request.font_size, &self.config);
        let layer_id = if self.layers.contains(batch.layer_id) {
            batch.layer_id
        } else {
            self.layers.current_id()?
        };
        let text = RecognizedText {
            id: Uuid::new_v4(),
            text: request.text,
            position,
            font_size,
            typeface: request.typeface,
            color: request.color,
            layer_id,
            strokes: strokes.iter().map(|s| s.id()).collect(),
        };
        log::info!("Recognized {:?} replacing {} strokes", text.text, text.strokes.len());
        let id = text.id;
        self.overlay.insert(text);
        Some(id)
    }

    // --- Rendering ---

    /// Draw commands for the current state.
    ///
    /// Texts of visible layers come first, then the visible strokes that
    /// have not been replaced by text, the stroke in progress and finally
    /// the lasso outline.
    pub fn display_list(&self) -> DisplayList<'_> {
        let mut items = Vec::new();
        let visible = |layer_id: LayerId| self.layers.layer(layer_id).is_some_and(|l| l.visible);

        for text in self.overlay.texts().iter().filter(|t| visible(t.layer_id)) {
            items.push(DisplayItem::Text(text));
        }
        for layer in self.layers.layers().iter().filter(|l| l.visible) {
            for stroke in layer.strokes.iter().filter(|s| !self.overlay.is_recognized(s.id())) {
                items.push(DisplayItem::Stroke {
                    path: &stroke.path,
                    style: stroke.style,
                    selected: self.selection.contains(&stroke.id()),
                });
            }
        }
        if let Gesture::Ink(ink) = &self.gesture {
            let style = match self.tool {
                Tool::Eraser => InkStyle::eraser(ink.width),
                _ => InkStyle {
                    width: ink.width,
                    ..self.pen_style
                },
            };
            items.push(DisplayItem::Stroke {
                path: ink.path(),
                style,
                selected: false,
            });
        }
        if let Some(lasso) = &self.lasso {
            items.push(DisplayItem::Lasso(lasso.to_path()));
        }
        DisplayList {
            transform: self.camera.transform(),
            items,
        }
    }

    // --- Persistence ---

    /// Snapshot layers, texts and view for saving.
    pub fn export_document(&self) -> CanvasDocument {
        CanvasDocument::new(self.layers.clone(), self.overlay.texts().to_vec(), self.camera.clone())
    }

    /// Replace the canvas contents with a saved document. History, selection
    /// and any gesture in progress are reset.
    pub fn load_document(&mut self, document: CanvasDocument) {
        self.gesture = Gesture::Idle;
        self.lasso = None;
        self.selection.clear();
        self.history.clear();
        self.debouncer.cancel();
        self.layers = document.layers;
        if self.layers.is_empty() {
            self.layers.add_layer(DEFAULT_LAYER_NAME, true);
        } else if self.layers.current().is_none() {
            self.layers.select_last();
        }
        self.overlay = TextOverlay::new();
        for text in document.texts {
            self.overlay.insert(text);
        }
        self.camera = document.camera;
        log::info!("Loaded document {} ({} layers)", document.id, self.layers.len());
        self.notify_transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn draw(canvas: &mut InkCanvas, points: &[(f64, f64)], start_ms: u64) -> bool {
        let (x, y) = points[0];
        let mut consumed = canvas.handle_pointer(PointerEvent::down(x, y, start_ms));
        for (i, &(x, y)) in points.iter().enumerate().skip(1) {
            consumed &= canvas.handle_pointer(PointerEvent::moved(x, y, start_ms + i as u64 * 16));
        }
        let (x, y) = points[points.len() - 1];
        consumed &= canvas.handle_pointer(PointerEvent::up(x, y, start_ms + points.len() as u64 * 16));
        consumed
    }

    fn lasso_rect(canvas: &mut InkCanvas, from: (f64, f64), to: (f64, f64)) {
        canvas.set_tool(Tool::Lasso);
        canvas.set_lasso_shape(LassoShape::Rectangle);
        canvas.handle_pointer(PointerEvent::down(from.0, from.1, 0));
        canvas.handle_pointer(PointerEvent::moved(to.0, to.1, 10));
        canvas.handle_pointer(PointerEvent::up(to.0, to.1, 20));
    }

    fn stroke_ids(canvas: &InkCanvas, layer: LayerId) -> Vec<StrokeId> {
        canvas.layers().layer(layer).unwrap().strokes.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn test_pen_commits_to_current_layer() {
        let mut canvas = InkCanvas::default();
        assert!(draw(&mut canvas, &[(10.0, 10.0), (20.0, 20.0), (30.0, 25.0)], 0));
        let layer = canvas.layers().current().unwrap();
        assert_eq!(layer.strokes.len(), 1);
        let stroke = &layer.strokes[0];
        assert_eq!(stroke.layer_id, 1);
        assert_eq!(stroke.points.len(), 3);
        assert!(!stroke.style.is_eraser());
        assert!(canvas.can_undo());
    }

    #[test]
    fn test_strokes_use_canvas_coordinates() {
        let mut canvas = InkCanvas::default();
        canvas.pan(Vec2::new(100.0, 50.0));
        canvas.update_scale(2.0);
        draw(&mut canvas, &[(100.0, 50.0), (120.0, 70.0)], 0);
        let bounds = canvas.layers().current().unwrap().strokes[0].bounds();
        assert!((bounds.x0).abs() < 1e-9);
        assert!((bounds.y0).abs() < 1e-9);
        assert!((bounds.x1 - 10.0).abs() < 1e-9);
        assert!((bounds.y1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stylus_pressure_sets_width() {
        let mut canvas = InkCanvas::default();
        canvas.set_pen_size(10.0);
        canvas.handle_pointer(PointerEvent::down(0.0, 0.0, 0).with_stylus(0.5));
        canvas.handle_pointer(PointerEvent::moved(20.0, 0.0, 10).with_stylus(0.0));
        canvas.handle_pointer(PointerEvent::up(20.0, 0.0, 20).with_stylus(0.0));
        let width = canvas.layers().current().unwrap().strokes[0].style.width;
        assert!((width - 3.0).abs() < 1e-10);

        canvas.handle_pointer(PointerEvent::down(0.0, 50.0, 100).with_stylus(0.5));
        canvas.handle_pointer(PointerEvent::moved(20.0, 50.0, 110).with_stylus(1.0));
        canvas.handle_pointer(PointerEvent::up(20.0, 50.0, 120).with_stylus(1.0));
        let width = canvas.layers().current().unwrap().strokes[1].style.width;
        assert!((width - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_style_captured_at_commit() {
        let mut canvas = InkCanvas::default();
        canvas.set_pen_color(SerializableColor::new(200, 0, 0, 255));
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0);
        canvas.set_pen_color(SerializableColor::black());
        canvas.set_pen_size(40.0);
        let stroke = &canvas.layers().current().unwrap().strokes[0];
        assert_eq!(stroke.style.color, SerializableColor::new(200, 0, 0, 255));
        assert!(stroke.style.width < 40.0);
    }

    #[test]
    fn test_eraser_commits_clear_stroke() {
        let mut canvas = InkCanvas::default();
        canvas.set_tool(Tool::Eraser);
        assert!((canvas.set_eraser_size(500.0) - 100.0).abs() < f64::EPSILON);
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0);
        let stroke = &canvas.layers().current().unwrap().strokes[0];
        assert!(stroke.style.is_eraser());
        assert!((stroke.style.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pencil_disabled_ignores_ink() {
        let mut canvas = InkCanvas::default();
        canvas.set_pencil_enabled(false);
        assert!(!draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0));
        assert_eq!(canvas.layers().stroke_count(), 0);
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_cancel_discards_stroke_and_snapshot() {
        let mut canvas = InkCanvas::default();
        canvas.handle_pointer(PointerEvent::down(0.0, 0.0, 0));
        canvas.handle_pointer(PointerEvent::moved(30.0, 30.0, 10));
        assert!(canvas.handle_pointer(PointerEvent::cancel(30.0, 30.0, 20)));
        assert_eq!(canvas.layers().stroke_count(), 0);
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_multi_touch_not_consumed() {
        let mut canvas = InkCanvas::default();
        assert!(!canvas.handle_pointer(PointerEvent::down(0.0, 0.0, 0).with_pointer_count(2)));
        assert_eq!(canvas.layers().stroke_count(), 0);
    }

    #[test]
    fn test_view_mode_drag_pans() {
        let mut canvas = InkCanvas::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        canvas.on_transform_changed(move |offset, scale| sink.borrow_mut().push((offset, scale)));

        canvas.set_writing_mode(false);
        assert!(draw(&mut canvas, &[(100.0, 100.0), (130.0, 90.0)], 0));
        assert_eq!(canvas.layers().stroke_count(), 0);
        assert_eq!(canvas.camera().offset, Vec2::new(30.0, -10.0));
        assert_eq!(seen.borrow().last(), Some(&(Vec2::new(30.0, -10.0), 1.0)));
    }

    #[test]
    fn test_transform_callback_on_scale() {
        let mut canvas = InkCanvas::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        canvas.on_transform_changed(move |_, scale| sink.borrow_mut().push(scale));
        canvas.update_scale(10.0);
        canvas.update_scale(0.01);
        assert_eq!(*seen.borrow(), vec![5.0, 0.5]);
    }

    #[test]
    fn test_viewport_init_notifies_once() {
        let mut canvas = InkCanvas::default();
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        canvas.on_transform_changed(move |_, _| *sink.borrow_mut() += 1);
        canvas.set_viewport_size(Size::new(1080.0, 1920.0));
        let offset = canvas.camera().offset;
        canvas.set_viewport_size(Size::new(1080.0, 1920.0));
        canvas.set_viewport_size(Size::new(1920.0, 1080.0));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(canvas.camera().offset, offset);
    }

    #[test]
    fn test_draw_and_undo_scenario() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0);
        draw(&mut canvas, &[(50.0, 0.0), (60.0, 10.0)], 1000);
        let ids = stroke_ids(&canvas, 1);
        assert_eq!(ids.len(), 2);
        let (a, b) = (ids[0], ids[1]);

        assert!(canvas.undo());
        assert_eq!(stroke_ids(&canvas, 1), vec![a]);
        assert!(canvas.undo());
        assert!(stroke_ids(&canvas, 1).is_empty());
        assert!(canvas.redo());
        assert!(canvas.redo());
        assert_eq!(stroke_ids(&canvas, 1), vec![a, b]);
    }

    #[test]
    fn test_lasso_delete_scenario() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (80.0, 80.0)], 0);
        draw(&mut canvas, &[(200.0, 200.0), (250.0, 250.0)], 1000);
        let b = stroke_ids(&canvas, 1)[1];

        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        canvas.on_selection_complete(move |n| sink.borrow_mut().push(n));

        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.selected_stroke_count(), 1);
        assert_eq!(*counts.borrow(), vec![1]);

        assert_eq!(canvas.delete_lasso(), 1);
        assert_eq!(stroke_ids(&canvas, 1), vec![b]);
        assert!(!canvas.has_lasso());
    }

    #[test]
    fn test_empty_selection_is_reported() {
        let mut canvas = InkCanvas::default();
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        canvas.on_selection_complete(move |n| sink.borrow_mut().push(n));
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(*counts.borrow(), vec![0]);
        assert!(canvas.has_lasso());
    }

    #[test]
    fn test_hidden_layer_excluded_from_lasso() {
        let mut canvas = InkCanvas::default();
        let layer = canvas.add_layer("Layer 2", true);
        draw(&mut canvas, &[(10.0, 10.0), (40.0, 40.0)], 0);
        assert_eq!(canvas.layers().layer(layer).unwrap().strokes.len(), 1);
        canvas.toggle_layer_visibility(layer).unwrap();

        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.selected_stroke_count(), 0);
    }

    #[test]
    fn test_selection_move_moves_strokes_and_text() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 50.0)], 0);
        draw(&mut canvas, &[(300.0, 300.0), (320.0, 320.0)], 1000);
        let batch = canvas.pending_strokes();
        let moved_id = batch.traces[0].stroke_id;
        let moved_batch = StrokeBatch { traces: vec![batch.traces[0].clone()], ..batch.clone() };
        canvas.add_recognized_text(&moved_batch, TextRequest::new("hi")).unwrap();
        let text_before = canvas.texts()[0].position;
        let before = canvas.layers().find_stroke(moved_id).unwrap().bounds();
        let other_before = canvas.layers().layer(1).unwrap().strokes[1].bounds();

        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.selected_strokes(), &[moved_id]);

        canvas.handle_pointer(PointerEvent::down(50.0, 50.0, 0));
        canvas.handle_pointer(PointerEvent::moved(60.0, 45.0, 10));
        canvas.handle_pointer(PointerEvent::moved(75.0, 80.0, 20));
        canvas.handle_pointer(PointerEvent::up(75.0, 80.0, 30));

        let delta = Vec2::new(25.0, 30.0);
        let after = canvas.layers().find_stroke(moved_id).unwrap().bounds();
        assert!((after.x0 - before.x0 - delta.x).abs() < 1e-9);
        assert!((after.y0 - before.y0 - delta.y).abs() < 1e-9);
        assert!((after.x1 - before.x1 - delta.x).abs() < 1e-9);
        assert!((after.y1 - before.y1 - delta.y).abs() < 1e-9);
        let text_after = canvas.texts()[0].position;
        assert!((text_after - text_before - delta).hypot() < 1e-9);
        assert_eq!(canvas.layers().layer(1).unwrap().strokes[1].bounds(), other_before);
        assert_eq!(canvas.lasso().unwrap().bounds(), Rect::new(25.0, 30.0, 125.0, 130.0));

        // The move is undoable.
        assert!(canvas.undo());
        assert_eq!(canvas.layers().find_stroke(moved_id).unwrap().bounds(), before);
    }

    #[test]
    fn test_move_region_reselects() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(220.0, 20.0), (260.0, 60.0)], 0);
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.selected_stroke_count(), 0);

        // Grab the empty region and drag it over the stroke.
        canvas.handle_pointer(PointerEvent::down(50.0, 50.0, 0));
        canvas.handle_pointer(PointerEvent::moved(150.0, 50.0, 10));
        canvas.handle_pointer(PointerEvent::up(250.0, 50.0, 20));
        assert_eq!(canvas.selected_stroke_count(), 1);
        assert_eq!(canvas.lasso().unwrap().bounds(), Rect::new(200.0, 0.0, 300.0, 100.0));
    }

    #[test]
    fn test_lasso_down_far_from_region_starts_new_one() {
        let mut canvas = InkCanvas::default();
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        lasso_rect(&mut canvas, (500.0, 500.0), (600.0, 650.0));
        assert_eq!(canvas.lasso().unwrap().bounds(), Rect::new(500.0, 500.0, 600.0, 650.0));
    }

    #[test]
    fn test_degenerate_lasso_clears() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 60.0)], 0);
        lasso_rect(&mut canvas, (40.0, 0.0), (40.0, 100.0));
        assert_eq!(canvas.selected_stroke_count(), 0);
        assert!(!canvas.has_lasso());
    }

    #[test]
    fn test_delete_selected_keeps_region() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 60.0)], 0);
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.delete_selected_strokes(), 1);
        assert_eq!(canvas.layers().stroke_count(), 0);
        assert_eq!(canvas.selected_stroke_count(), 0);
        assert!(canvas.has_lasso());
        assert!(canvas.undo());
        assert_eq!(canvas.layers().stroke_count(), 1);
    }

    #[test]
    fn test_delete_lasso_removes_associated_text() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 60.0)], 0);
        let batch = canvas.pending_strokes();
        canvas.add_recognized_text(&batch, TextRequest::new("x")).unwrap();
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        assert_eq!(canvas.selected_stroke_count(), 1);
        canvas.delete_lasso();
        assert!(canvas.texts().is_empty());
        assert_eq!(canvas.layers().stroke_count(), 0);
    }

    #[test]
    fn test_tool_switch_clears_selection() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 60.0)], 0);
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        canvas.set_tool(Tool::Pen);
        assert!(!canvas.has_lasso());
        assert_eq!(canvas.selected_stroke_count(), 0);
    }

    #[test]
    fn test_clear_current_layer_is_undoable() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0);
        draw(&mut canvas, &[(20.0, 0.0), (30.0, 10.0)], 1000);
        canvas.clear_current_layer();
        assert_eq!(canvas.layers().stroke_count(), 0);
        assert!(canvas.undo());
        assert_eq!(canvas.layers().stroke_count(), 2);
    }

    #[test]
    fn test_remove_last_layer_rejected() {
        let mut canvas = InkCanvas::default();
        assert_eq!(canvas.remove_layer(1), Err(LayerError::LastLayer));
        let id = canvas.add_layer("Layer 2", true);
        assert!(canvas.remove_layer(id).is_ok());
        assert_eq!(canvas.layers().current_id(), Some(1));
    }

    #[test]
    fn test_poll_debounces_batch() {
        let mut canvas = InkCanvas::default();
        let batches = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&batches);
        canvas.on_stroke_batch_ready(move |_| *sink.borrow_mut() += 1);

        draw(&mut canvas, &[(0.0, 0.0), (40.0, 0.0)], 0);
        let first_end = canvas.last_stroke_end().unwrap();
        draw(&mut canvas, &[(0.0, 20.0), (40.0, 20.0)], first_end + 500);
        let second_end = canvas.last_stroke_end().unwrap();

        assert!(canvas.poll(first_end + 1200).is_none());
        assert!(canvas.poll(second_end + 1199).is_none());
        let batch = canvas.poll(second_end + 1200).unwrap();
        assert_eq!(batch.traces.len(), 2);
        assert_eq!(*batches.borrow(), 1);
        assert!(canvas.poll(second_end + 5000).is_none());
    }

    #[test]
    fn test_pointer_down_cancels_pending_recognition() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(0.0, 0.0), (40.0, 0.0)], 0);
        assert!(canvas.recognition_pending());
        canvas.handle_pointer(PointerEvent::down(0.0, 50.0, 2000));
        assert!(!canvas.recognition_pending());
        assert!(canvas.poll(5000).is_none());
    }

    #[test]
    fn test_eraser_strokes_not_batched() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(0.0, 0.0), (40.0, 0.0)], 0);
        canvas.set_tool(Tool::Eraser);
        draw(&mut canvas, &[(0.0, 0.0), (40.0, 0.0)], 1000);
        assert_eq!(canvas.pending_strokes().traces.len(), 1);
    }

    #[test]
    fn test_recognized_strokes_hidden_but_kept() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(10.0, 30.0), (200.0, 80.0)], 0);
        let batch = canvas.pending_strokes();
        let id = canvas.add_recognized_text(&batch, TextRequest::new("hello")).unwrap();

        let text = &canvas.texts()[0];
        assert_eq!(text.id, id);
        assert_eq!(text.strokes, batch.stroke_ids().collect::<Vec<_>>());
        assert!((text.font_size - 50.0).abs() < 1e-9);
        assert!((text.position.x - 10.0).abs() < 1e-9);
        assert!((text.position.y - 80.0).abs() < 1e-9);

        assert_eq!(canvas.layers().stroke_count(), 1);
        assert!(canvas.pending_strokes().is_empty());
        let list = canvas.display_list();
        assert_eq!(list.items.len(), 1);
        assert!(matches!(list.items[0], DisplayItem::Text(_)));

        // Already consumed: a second answer for the same batch is dropped.
        assert!(canvas.add_recognized_text(&batch, TextRequest::new("again")).is_none());
    }

    #[test]
    fn test_blank_text_ignored() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(10.0, 30.0), (200.0, 80.0)], 0);
        let batch = canvas.pending_strokes();
        assert!(canvas.add_recognized_text(&batch, TextRequest::new("   ")).is_none());
        assert!(canvas.texts().is_empty());
    }

    #[test]
    fn test_apply_recognition_failure_is_noop() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(10.0, 30.0), (200.0, 80.0)], 0);
        let batch = canvas.pending_strokes();
        assert!(canvas.apply_recognition(&batch, Err(RecognitionError::Unavailable)).is_none());
        assert!(canvas.apply_recognition(&batch, Ok(None)).is_none());
        assert!(canvas.texts().is_empty());
        assert_eq!(canvas.pending_strokes().traces.len(), 1);
    }

    struct FixedRecognizer(&'static str);

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _batch: StrokeBatch) -> BoxFuture<'static, Result<Option<String>, RecognitionError>> {
            let text = self.0.to_string();
            Box::pin(async move { Ok(Some(text)) })
        }
    }

    #[test]
    fn test_recognizer_round_trip() {
        let mut canvas = InkCanvas::default().with_recognizer(Arc::new(FixedRecognizer("42")));
        canvas.set_typeface(Typeface::Calligraphy);
        draw(&mut canvas, &[(10.0, 30.0), (200.0, 80.0)], 0);
        let batch = canvas.poll(10_000).unwrap();
        let task = canvas.recognition_task(&batch).unwrap();
        let result = pollster::block_on(task);
        assert!(canvas.apply_recognition(&batch, result).is_some());
        assert_eq!(canvas.texts()[0].text, "42");
        assert_eq!(canvas.texts()[0].typeface, Typeface::Calligraphy);
    }

    #[test]
    fn test_display_list_skips_hidden_layers() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 0);
        canvas.add_layer("Layer 2", true);
        draw(&mut canvas, &[(0.0, 0.0), (10.0, 10.0)], 1000);
        assert_eq!(canvas.display_list().items.len(), 2);
        canvas.toggle_layer_visibility(1).unwrap();
        assert_eq!(canvas.display_list().items.len(), 1);
    }

    #[test]
    fn test_document_round_trip() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(10.0, 30.0), (200.0, 80.0)], 0);
        let batch = canvas.pending_strokes();
        canvas.add_recognized_text(&batch, TextRequest::new("hello")).unwrap();
        let doc = canvas.export_document();

        let mut restored = InkCanvas::default();
        restored.load_document(doc);
        assert_eq!(restored.layers().stroke_count(), 1);
        assert_eq!(restored.texts().len(), 1);
        assert!(restored.pending_strokes().is_empty());
        assert!(!restored.can_undo());
    }

    #[test]
    fn test_undo_redo_move_keeps_text_with_strokes() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 50.0)], 0);
        let batch = canvas.pending_strokes();
        let id = batch.traces[0].stroke_id;
        canvas.add_recognized_text(&batch, TextRequest::new("hi")).unwrap();
        let stroke_before = canvas.layers().find_stroke(id).unwrap().bounds().origin();
        let text_before = canvas.texts()[0].position;

        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        canvas.handle_pointer(PointerEvent::down(50.0, 50.0, 0));
        canvas.handle_pointer(PointerEvent::moved(250.0, 250.0, 10));
        canvas.handle_pointer(PointerEvent::up(250.0, 250.0, 20));
        let delta = Vec2::new(200.0, 200.0);
        let text_moved = canvas.texts()[0].position;
        assert!((text_moved - text_before - delta).hypot() < 1e-9);

        assert!(canvas.undo());
        let stroke_undone = canvas.layers().find_stroke(id).unwrap().bounds().origin();
        assert!((stroke_undone - stroke_before).hypot() < 1e-9);
        assert!((canvas.texts()[0].position - text_before).hypot() < 1e-9);

        assert!(canvas.redo());
        let stroke_redone = canvas.layers().find_stroke(id).unwrap().bounds().origin();
        assert!((stroke_redone - stroke_before - delta).hypot() < 1e-9);
        assert!((canvas.texts()[0].position - text_moved).hypot() < 1e-9);
    }

    #[test]
    fn test_tap_on_selection_leaves_no_undo_step() {
        let mut canvas = InkCanvas::default();
        draw(&mut canvas, &[(20.0, 20.0), (60.0, 60.0)], 0);
        lasso_rect(&mut canvas, (0.0, 0.0), (100.0, 100.0));
        let steps = canvas.history.undo_len();

        canvas.handle_pointer(PointerEvent::down(50.0, 50.0, 100));
        canvas.handle_pointer(PointerEvent::up(50.0, 50.0, 110));
        assert_eq!(canvas.history.undo_len(), steps);
        assert_eq!(canvas.selected_stroke_count(), 1);

        canvas.handle_pointer(PointerEvent::down(50.0, 50.0, 200));
        canvas.handle_pointer(PointerEvent::moved(55.0, 50.0, 210));
        canvas.handle_pointer(PointerEvent::moved(60.0, 50.0, 220));
        canvas.handle_pointer(PointerEvent::up(60.0, 50.0, 230));
        assert_eq!(canvas.history.undo_len(), steps + 1);
    }

    #[test]
    fn test_stylus_tap_uses_pressure_width() {
        let mut canvas = InkCanvas::default();
        canvas.set_pen_size(10.0);
        canvas.handle_pointer(PointerEvent::down(5.0, 5.0, 0).with_stylus(0.0));
        canvas.handle_pointer(PointerEvent::up(5.0, 5.0, 10).with_stylus(0.0));
        let width = canvas.layers().current().unwrap().strokes[0].style.width;
        assert!((width - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_load_document_without_current_layer() {
        let mut canvas = InkCanvas::default();
        canvas.add_layer("Layer 2", true);
        let mut value = serde_json::to_value(canvas.export_document()).unwrap();
        value["layers"]["current"] = serde_json::Value::Null;
        let doc: CanvasDocument = serde_json::from_value(value).unwrap();

        let mut restored = InkCanvas::default();
        restored.load_document(doc);
        assert_eq!(restored.layers().current_id(), Some(2));
    }
}
