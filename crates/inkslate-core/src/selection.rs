//! Lasso selection: region geometry, gesture state and hit-testing.

use crate::config::CanvasConfig;
use crate::layer::LayerManager;
use crate::region::Region;
use crate::stroke::{Stroke, StrokeId};
use kurbo::{Affine, BezPath, Circle, PathEl, Point, Rect, Shape, Vec2};
use serde::{Deserialize, Serialize};

/// Tolerance used when converting rect/circle regions to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Which kind of region a new lasso gesture draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LassoShape {
    #[default]
    Freehand,
    Rectangle,
    Circle,
}

/// A lasso region in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub enum LassoRegion {
    /// Open while drawing, closed once the gesture ends.
    Freehand(BezPath),
    /// Normalized rectangle.
    Rectangle(Rect),
    /// Circle inscribed in the normalized rectangle.
    Circle(Rect),
}

impl LassoRegion {
    /// Start a region of `shape` at `start`.
    pub fn begin(shape: LassoShape, start: Point) -> Self {
        match shape {
            LassoShape::Freehand => {
                let mut path = BezPath::new();
                path.move_to(start);
                LassoRegion::Freehand(path)
            }
            LassoShape::Rectangle => LassoRegion::Rectangle(Rect::from_points(start, start)),
            LassoShape::Circle => LassoRegion::Circle(Rect::from_points(start, start)),
        }
    }

    /// Extend the region while it is being drawn. Rect and circle regions
    /// span from the fixed `start` to `point`.
    pub fn extend(&mut self, start: Point, point: Point) {
        match self {
            LassoRegion::Freehand(path) => path.line_to(point),
            LassoRegion::Rectangle(rect) | LassoRegion::Circle(rect) => {
                *rect = Rect::from_points(start, point);
            }
        }
    }

    /// Close a freehand region. No-op for the other shapes.
    pub fn close(&mut self) {
        if let LassoRegion::Freehand(path) = self {
            if !matches!(path.elements().last(), Some(PathEl::ClosePath) | None) {
                path.close_path();
            }
        }
    }

    pub fn shape(&self) -> LassoShape {
        match self {
            LassoRegion::Freehand(_) => LassoShape::Freehand,
            LassoRegion::Rectangle(_) => LassoShape::Rectangle,
            LassoRegion::Circle(_) => LassoShape::Circle,
        }
    }

    fn circle(rect: &Rect) -> Circle {
        Circle::new(rect.center(), rect.width().min(rect.height()) / 2.0)
    }

    /// Bounding box of the region geometry.
    pub fn bounds(&self) -> Rect {
        match self {
            LassoRegion::Freehand(path) => {
                if path.elements().is_empty() {
                    Rect::ZERO
                } else {
                    path.bounding_box()
                }
            }
            LassoRegion::Rectangle(rect) => *rect,
            LassoRegion::Circle(rect) => Self::circle(rect).bounding_box(),
        }
    }

    /// A region with no area cannot be hit-tested.
    pub fn is_degenerate(&self) -> bool {
        let bounds = self.bounds();
        bounds.width() <= 0.0 || bounds.height() <= 0.0
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            LassoRegion::Freehand(path) => path.apply_affine(Affine::translate(delta)),
            LassoRegion::Rectangle(rect) | LassoRegion::Circle(rect) => *rect = *rect + delta,
        }
    }

    /// Whether `point` is close enough to grab the region: inside its
    /// bounding box grown by `tolerance`.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    /// Closed outline, for rendering and rasterization.
    pub fn to_path(&self) -> BezPath {
        match self {
            LassoRegion::Freehand(path) => {
                let mut path = path.clone();
                if !matches!(path.elements().last(), Some(PathEl::ClosePath) | None) {
                    path.close_path();
                }
                path
            }
            LassoRegion::Rectangle(rect) => rect.to_path(PATH_TOLERANCE),
            LassoRegion::Circle(rect) => Self::circle(rect).to_path(PATH_TOLERANCE),
        }
    }
}

/// Lasso gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LassoState {
    #[default]
    Idle,
    /// Drawing a new region that started at `start` (canvas space).
    DrawingRegion { start: Point },
    /// Dragging the selected strokes together with the region. `moved` is
    /// set once the strokes have actually been displaced.
    MovingSelection { last: Point, moved: bool },
    /// Dragging an empty-selection region.
    MovingRegion { last: Point },
}

impl LassoState {
    /// Advance a moving state to `current`, returning the delta since the
    /// previous position.
    pub fn drag_to(&mut self, current: Point) -> Option<Vec2> {
        match self {
            LassoState::MovingSelection { last, .. } | LassoState::MovingRegion { last } => {
                let delta = current - *last;
                *last = current;
                Some(delta)
            }
            _ => None,
        }
    }
}

/// Rasterize a stroke for hit-testing: its center line dilated by `margin`.
pub fn stroke_region(stroke: &Stroke, margin: f64, cell: f64) -> Region {
    Region::from_stroke_path(&stroke.path, margin, cell)
}

/// Find all strokes of visible layers that the region touches.
///
/// A stroke is selected when its path comes within
/// `lasso_margin + stroke_margin` of the region, and never when it stays
/// farther away. Strokes are quick-rejected by bounding box before their
/// raster region is built. Recognized strokes are not excluded.
pub fn select_strokes(layers: &LayerManager, lasso: &LassoRegion, config: &CanvasConfig) -> Vec<StrokeId> {
    let lasso_region = Region::from_closed_path(&lasso.to_path(), config.lasso_margin, config.raster_cell);
    let Some(lasso_bounds) = lasso_region.bounds() else {
        return Vec::new();
    };

    let mut selected = Vec::new();
    for layer in layers.layers().iter().filter(|l| l.visible) {
        for stroke in &layer.strokes {
            let reach = config.stroke_margin;
            let bounds = stroke.bounds().inflate(reach, reach);
            if !overlaps(bounds, lasso_bounds) {
                continue;
            }
            if stroke_region(stroke, config.stroke_margin, config.raster_cell).intersects(&lasso_region) {
                selected.push(stroke.id());
            }
        }
    }
    log::debug!("Lasso hit-test selected {} strokes", selected.len());
    selected
}

/// Rect overlap test that accepts zero-width boxes.
fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}
