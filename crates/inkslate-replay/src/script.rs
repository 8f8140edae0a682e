//! Session scripts.
//!
//! A script is JSON with the canvas config, the viewport and a list of steps:
//! ```json
//! {
//!   "viewport": { "width": 1080, "height": 1920 },
//!   "answers": ["hello"],
//!   "steps": [
//!     { "type": "stroke", "points": [[10, 10], [60, 40]] },
//!     { "type": "wait", "ms": 1500 }
//!   ]
//! }
//! ```

use inkslate_core::{CanvasConfig, LassoShape, LayerId, PointerEvent, Tool};
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Interval between generated samples of a `stroke` step.
fn default_interval() -> u64 {
    16
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// One scripted host action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// A raw pointer event, in screen coordinates.
    Pointer(PointerEvent),
    /// Down, moves and up through the given screen points.
    Stroke {
        points: Vec<[f64; 2]>,
        #[serde(default = "default_interval")]
        interval_ms: u64,
        /// Stylus pressure; finger input when absent.
        #[serde(default)]
        stylus_pressure: Option<f64>,
    },
    Tool { tool: Tool },
    LassoShape { shape: LassoShape },
    PenSize { size: f64 },
    EraserSize { size: f64 },
    Undo,
    Redo,
    DeleteLasso,
    DeleteSelected,
    ClearLasso,
    ClearLayer,
    AddLayer {
        name: String,
        #[serde(default = "default_visible")]
        visible: bool,
    },
    RemoveLayer { id: LayerId },
    ToggleLayer { id: LayerId },
    Scale { factor: f64 },
    Pan { dx: f64, dy: f64 },
    /// Advance the clock.
    Wait { ms: u64 },
    WritingMode { enabled: bool },
}

impl Step {
    /// Expand a `stroke` step into pointer events starting at `start_ms`.
    pub fn pointer_events(&self, start_ms: u64) -> Vec<PointerEvent> {
        let Step::Stroke { points, interval_ms, stylus_pressure } = self else {
            return Vec::new();
        };
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Vec::new();
        };
        let with_input = |event: PointerEvent| match stylus_pressure {
            Some(p) => event.with_stylus(*p),
            None => event,
        };
        let mut events = vec![with_input(PointerEvent::down(first[0], first[1], start_ms))];
        let mut t = start_ms;
        for p in points.iter().skip(1) {
            t += interval_ms;
            events.push(with_input(PointerEvent::moved(p[0], p[1], t)));
        }
        t += interval_ms;
        events.push(with_input(PointerEvent::up(last[0], last[1], t)));
        events
    }
}

/// A full replay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: CanvasConfig,
    pub viewport: Viewport,
    /// Recognizer answers, consumed in order. `null` means nothing recognized.
    #[serde(default)]
    pub answers: Vec<Option<String>>,
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse and validate a script.
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let script: Self = serde_json::from_str(json)?;
        script.config.validate()?;
        Ok(script)
    }

    /// Read a script from disk.
    pub fn load(path: &str) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
