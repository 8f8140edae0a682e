//! Committed ink strokes.

use crate::layer::LayerId;
use crate::style::InkStyle;
use kurbo::{Affine, BezPath, ParamCurve, ParamCurveArclen, Point, Rect, Shape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for strokes. Copies taken for undo keep the id.
pub type StrokeId = Uuid;

/// Accuracy used for arc-length measurement.
const ARCLEN_ACCURACY: f64 = 1e-3;

/// A recorded input point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// Timestamp in milliseconds.
    pub t: u64,
}

impl StrokePoint {
    pub fn new(point: Point, t: u64) -> Self {
        Self { x: point.x, y: point.y, t }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A single committed freehand path with its style and owning layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: StrokeId,
    /// Smoothed vector path in canvas space.
    pub path: BezPath,
    /// Raw points as they were recorded.
    pub points: Vec<StrokePoint>,
    /// Style captured at commit time.
    pub style: InkStyle,
    /// Layer the stroke was committed to.
    pub layer_id: LayerId,
}

impl Stroke {
    /// Create a stroke with a fresh id.
    pub fn new(path: BezPath, points: Vec<StrokePoint>, style: InkStyle, layer_id: LayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            points,
            style,
            layer_id,
        }
    }

    /// Build a stroke from a polyline (no smoothing).
    pub fn from_points(points: &[Point], style: InkStyle, layer_id: LayerId) -> Self {
        let mut path = BezPath::new();
        if let Some(first) = points.first() {
            path.move_to(*first);
            if points.len() == 1 {
                path.line_to(*first);
            }
            for p in points.iter().skip(1) {
                path.line_to(*p);
            }
        }
        let recorded = points.iter().map(|p| StrokePoint::new(*p, 0)).collect();
        Self::new(path, recorded, style, layer_id)
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    /// Bounding box of the path geometry (ink width not included).
    pub fn bounds(&self) -> Rect {
        if self.path.elements().is_empty() {
            return Rect::ZERO;
        }
        self.path.bounding_box()
    }

    /// Translate the stroke geometry.
    pub fn translate(&mut self, delta: Vec2) {
        self.path.apply_affine(Affine::translate(delta));
        for p in &mut self.points {
            p.x += delta.x;
            p.y += delta.y;
        }
    }

    /// Total arc length of the path.
    pub fn length(&self) -> f64 {
        self.path.segments().map(|seg| seg.arclen(ARCLEN_ACCURACY)).sum()
    }

    /// Sample the path every `spacing` units of arc length, starting at the
    /// beginning, with at most `cap` samples. Empty for zero-length paths.
    pub fn resample(&self, spacing: f64, cap: usize) -> Vec<Point> {
        let mut samples = Vec::new();
        if spacing <= 0.0 {
            return samples;
        }
        let mut distance = 0.0;
        let mut seg_start = 0.0;
        for seg in self.path.segments() {
            let len = seg.arclen(ARCLEN_ACCURACY);
            while distance < seg_start + len && samples.len() < cap {
                let t = seg.inv_arclen(distance - seg_start, ARCLEN_ACCURACY);
                samples.push(seg.eval(t));
                distance += spacing;
            }
            seg_start += len;
            if samples.len() >= cap {
                break;
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(from: Point, to: Point) -> Stroke {
        Stroke::from_points(&[from, to], InkStyle::pen(4.0), 1)
    }

    #[test]
    fn test_bounds() {
        let stroke = Stroke::from_points(
            &[Point::new(0.0, 0.0), Point::new(100.0, 50.0), Point::new(50.0, 100.0)],
            InkStyle::pen(4.0),
            1,
        );
        let bounds = stroke.bounds();
        assert!((bounds.x0).abs() < f64::EPSILON);
        assert!((bounds.y0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_translate_moves_bounds_and_points() {
        let mut stroke = line(Point::new(10.0, 10.0), Point::new(20.0, 30.0));
        let before = stroke.bounds();
        stroke.translate(Vec2::new(5.0, -3.0));
        let after = stroke.bounds();
        assert!((after.x0 - before.x0 - 5.0).abs() < 1e-10);
        assert!((after.y1 - before.y1 + 3.0).abs() < 1e-10);
        assert!((stroke.points[0].x - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_clone_keeps_identity() {
        let stroke = line(Point::ZERO, Point::new(1.0, 1.0));
        let copy = stroke.clone();
        assert_eq!(copy.id(), stroke.id());
        assert_eq!(copy, stroke);
        assert_ne!(line(Point::ZERO, Point::new(1.0, 1.0)).id(), stroke.id());
    }

    #[test]
    fn test_resample_spacing() {
        let stroke = line(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let samples = stroke.resample(10.0, 1000);
        assert_eq!(samples.len(), 10);
        assert!((samples[3].x - 30.0).abs() < 1e-2);
        assert!((samples[3].y).abs() < 1e-9);
    }

    #[test]
    fn test_resample_cap() {
        let stroke = line(Point::new(0.0, 0.0), Point::new(100_000.0, 0.0));
        assert_eq!(stroke.resample(10.0, 1000).len(), 1000);
    }

    #[test]
    fn test_resample_zero_length_is_empty() {
        let stroke = Stroke::from_points(&[Point::new(5.0, 5.0)], InkStyle::pen(4.0), 1);
        assert!(stroke.resample(10.0, 1000).is_empty());
    }
}
