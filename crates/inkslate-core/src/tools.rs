//! Drawing tools and in-progress ink accumulation.

use crate::stroke::StrokePoint;
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Lasso,
}

/// Map pointer pressure to a pen width.
///
/// Stylus pressure in `[0, 1]` maps to `[0.3, 1.2] × base`. Finger input
/// reports near-constant pressure and maps into the narrower
/// `[0.8, 1.2] × base` band.
pub fn pressure_width(base: f64, pressure: f64, is_stylus: bool) -> f64 {
    if is_stylus {
        base * (0.3 + pressure.clamp(0.0, 1.0) * 0.9)
    } else {
        base * (0.8 + (pressure.clamp(0.5, 1.5) - 0.5) * 0.4)
    }
}

/// Accumulates a pen or eraser path between pointer-down and pointer-up.
#[derive(Debug, Clone)]
pub struct InkBuilder {
    path: BezPath,
    points: Vec<StrokePoint>,
    last: Point,
    threshold: f64,
    /// Current width; pen strokes update it from pressure.
    pub width: f64,
}

impl InkBuilder {
    /// Start a path at `point` (canvas space).
    pub fn begin(point: Point, t: u64, width: f64, threshold: f64) -> Self {
        let mut path = BezPath::new();
        path.move_to(point);
        Self {
            path,
            points: vec![StrokePoint::new(point, t)],
            last: point,
            threshold,
            width,
        }
    }

    /// Extend the path if the point moved at least the threshold on either
    /// axis. Segments are quadratic curves through the midpoint of the last
    /// recorded point and `point`. Returns true if a point was recorded.
    pub fn extend(&mut self, point: Point, t: u64) -> bool {
        let dx = (point.x - self.last.x).abs();
        let dy = (point.y - self.last.y).abs();
        if dx < self.threshold && dy < self.threshold {
            return false;
        }
        self.path.quad_to(self.last, self.last.midpoint(point));
        self.last = point;
        self.points.push(StrokePoint::new(point, t));
        true
    }

    /// The path drawn so far, for live rendering.
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// End the path with a straight segment to the last recorded point.
    pub fn finish(mut self) -> (BezPath, Vec<StrokePoint>, f64) {
        self.path.line_to(self.last);
        (self.path, self.points, self.width)
    }
}
