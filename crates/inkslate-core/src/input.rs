//! Pointer events delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Gesture phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A single pointer sample in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: Point,
    /// Reported pressure; stylus input is normalized to `[0, 1]`.
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    #[serde(default)]
    pub is_stylus: bool,
    /// Number of pointers currently down.
    #[serde(default = "default_pointer_count")]
    pub pointer_count: u32,
    #[serde(default)]
    pub timestamp_ms: u64,
}

fn default_pressure() -> f64 {
    1.0
}

fn default_pointer_count() -> u32 {
    1
}

impl PointerEvent {
    /// Single finger event with full pressure.
    pub fn new(phase: PointerPhase, position: Point, timestamp_ms: u64) -> Self {
        Self {
            phase,
            position,
            pressure: default_pressure(),
            is_stylus: false,
            pointer_count: 1,
            timestamp_ms,
        }
    }

    pub fn down(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Down, Point::new(x, y), timestamp_ms)
    }

    pub fn moved(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Move, Point::new(x, y), timestamp_ms)
    }

    pub fn up(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Up, Point::new(x, y), timestamp_ms)
    }

    pub fn cancel(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::new(PointerPhase::Cancel, Point::new(x, y), timestamp_ms)
    }

    pub fn with_stylus(mut self, pressure: f64) -> Self {
        self.is_stylus = true;
        self.pressure = pressure;
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_pointer_count(mut self, pointer_count: u32) -> Self {
        self.pointer_count = pointer_count;
        self
    }

    /// Part of a multi-touch gesture.
    pub fn is_multi_touch(&self) -> bool {
        self.pointer_count > 1
    }
}
