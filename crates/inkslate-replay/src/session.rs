//! Drives an `InkCanvas` through a script, playing the host view, the
//! pointer source and the recognizer integration.

use inkslate_core::{CanvasDocument, InkCanvas, LayerError, PointerEvent};
use kurbo::{Size, Vec2};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::ReplayError;
use crate::recognizer::ScriptedRecognizer;
use crate::script::{Script, Step};

#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub id: u32,
    pub name: String,
    pub visible: bool,
    pub strokes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextSummary {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub layer_id: u32,
    pub strokes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformSummary {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

/// Final state of a replayed session.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub layers: Vec<LayerSummary>,
    pub texts: Vec<TextSummary>,
    pub selected: usize,
    pub has_lasso: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub transform: TransformSummary,
    /// Counts reported by every finished lasso hit-test.
    pub selection_events: Vec<usize>,
    pub transform_events: usize,
    pub recognition_batches: usize,
    /// Scripted recognizer answers never consumed.
    pub unused_answers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<CanvasDocument>,
}

/// Events observed through the canvas callbacks.
#[derive(Debug, Default)]
struct Observed {
    selections: Vec<usize>,
    transforms: usize,
    batches: usize,
}

pub struct Session {
    canvas: InkCanvas,
    recognizer: Arc<ScriptedRecognizer>,
    now_ms: u64,
    observed: Rc<RefCell<Observed>>,
}

impl Session {
    pub fn new(script: &Script) -> Self {
        let recognizer = Arc::new(ScriptedRecognizer::new(script.answers.iter().cloned()));
        let mut canvas = InkCanvas::new(script.config.clone()).with_recognizer(recognizer.clone());
        let observed = Rc::new(RefCell::new(Observed::default()));

        let sink = Rc::clone(&observed);
        canvas.on_selection_complete(move |count| sink.borrow_mut().selections.push(count));
        let sink = Rc::clone(&observed);
        canvas.on_transform_changed(move |_, _| sink.borrow_mut().transforms += 1);
        let sink = Rc::clone(&observed);
        canvas.on_stroke_batch_ready(move |_| sink.borrow_mut().batches += 1);

        canvas.set_viewport_size(Size::new(script.viewport.width, script.viewport.height));
        Self {
            canvas,
            recognizer,
            now_ms: 0,
            observed,
        }
    }

    /// Run every step, then let any pending recognition fire.
    pub fn run(&mut self, steps: &[Step]) -> Result<(), ReplayError> {
        for (index, step) in steps.iter().enumerate() {
            log::debug!("Step {}: {:?}", index, step);
            self.apply(step)
                .map_err(|source| ReplayError::Layer { step: index, source })?;
            self.tick();
        }
        self.now_ms += self.canvas.config().pause_threshold_ms;
        self.tick();
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> Result<(), LayerError> {
        match step {
            Step::Pointer(event) => self.pointer(*event),
            Step::Stroke { .. } => {
                for event in step.pointer_events(self.now_ms) {
                    self.pointer(event);
                }
            }
            Step::Tool { tool } => self.canvas.set_tool(*tool),
            Step::LassoShape { shape } => self.canvas.set_lasso_shape(*shape),
            Step::PenSize { size } => {
                self.canvas.set_pen_size(*size);
            }
            Step::EraserSize { size } => {
                self.canvas.set_eraser_size(*size);
            }
            Step::Undo => {
                self.canvas.undo();
            }
            Step::Redo => {
                self.canvas.redo();
            }
            Step::DeleteLasso => {
                self.canvas.delete_lasso();
            }
            Step::DeleteSelected => {
                self.canvas.delete_selected_strokes();
            }
            Step::ClearLasso => self.canvas.clear_lasso_selection(),
            Step::ClearLayer => self.canvas.clear_current_layer(),
            Step::AddLayer { name, visible } => {
                self.canvas.add_layer(name.clone(), *visible);
            }
            Step::RemoveLayer { id } => self.canvas.remove_layer(*id)?,
            Step::ToggleLayer { id } => {
                self.canvas.toggle_layer_visibility(*id)?;
            }
            Step::Scale { factor } => self.canvas.update_scale(*factor),
            Step::Pan { dx, dy } => self.canvas.pan(Vec2::new(*dx, *dy)),
            Step::Wait { ms } => self.now_ms += ms,
            Step::WritingMode { enabled } => self.canvas.set_writing_mode(*enabled),
        }
        Ok(())
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.now_ms = self.now_ms.max(event.timestamp_ms);
        if !self.canvas.handle_pointer(event) {
            log::debug!("Pointer event not consumed: {:?} (tool {:?})", event.phase, self.canvas.tool());
        }
    }

    /// Drive the recognition timer and feed results back synchronously.
    fn tick(&mut self) {
        let Some(batch) = self.canvas.poll(self.now_ms) else {
            return;
        };
        let Some(task) = self.canvas.recognition_task(&batch) else {
            return;
        };
        let result = pollster::block_on(task);
        self.canvas.apply_recognition(&batch, result);
    }

    pub fn summary(&self, include_document: bool) -> Summary {
        let canvas = &self.canvas;
        let observed = self.observed.borrow();
        Summary {
            layers: canvas
                .layers()
                .layers()
                .iter()
                .map(|l| LayerSummary {
                    id: l.id(),
                    name: l.name.clone(),
                    visible: l.visible,
                    strokes: l.strokes.len(),
                })
                .collect(),
            texts: canvas
                .texts()
                .iter()
                .map(|t| TextSummary {
                    text: t.text.clone(),
                    x: t.position.x,
                    y: t.position.y,
                    font_size: t.font_size,
                    layer_id: t.layer_id,
                    strokes: t.strokes.len(),
                })
                .collect(),
            selected: canvas.selected_stroke_count(),
            has_lasso: canvas.has_lasso(),
            can_undo: canvas.can_undo(),
            can_redo: canvas.can_redo(),
            transform: TransformSummary {
                translate_x: canvas.camera().offset.x,
                translate_y: canvas.camera().offset.y,
                scale: canvas.camera().scale,
            },
            selection_events: observed.selections.clone(),
            transform_events: observed.transforms,
            recognition_batches: observed.batches,
            unused_answers: self.recognizer.remaining(),
            document: include_document.then(|| canvas.export_document()),
        }
    }
}

/// Replay a whole script.
pub fn replay(script: &Script, include_document: bool) -> Result<Summary, ReplayError> {
    let mut session = Session::new(script);
    session.run(&script.steps)?;
    Ok(session.summary(include_document))
}
