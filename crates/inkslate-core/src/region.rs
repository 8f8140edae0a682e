//! Rasterized regions used for lasso hit-testing.
//!
//! A region is a set of grid cells stored as sorted, merged spans per row.
//! Cells are `cell` canvas units wide and a cell belongs to a shape when its
//! center does.

use kurbo::{BezPath, PathEl, Point, Rect};
use std::collections::BTreeMap;

/// Tolerance used when flattening curves into polylines.
pub const FLATTEN_TOLERANCE: f64 = 0.25;

/// Half-open run of cells `[start, end)` within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: i64,
    end: i64,
}

/// A rasterized area of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    cell: f64,
    rows: BTreeMap<i64, Vec<Span>>,
}

impl Region {
    /// An empty region on a grid of the given cell size.
    pub fn empty(cell: f64) -> Self {
        Self {
            cell,
            rows: BTreeMap::new(),
        }
    }

    /// Fill the interior of closed polygons using the nonzero winding rule.
    pub fn from_fill(polygons: &[Vec<Point>], cell: f64) -> Self {
        let mut region = Self::empty(cell);
        let (Some(min_y), Some(max_y)) = (
            polygons.iter().flatten().map(|p| p.y).reduce(f64::min),
            polygons.iter().flatten().map(|p| p.y).reduce(f64::max),
        ) else {
            return region;
        };

        let first_row = (min_y / cell - 0.5).ceil() as i64;
        let last_row = (max_y / cell - 0.5).floor() as i64;
        let mut crossings: Vec<(f64, i32)> = Vec::new();
        for row in first_row..=last_row {
            let y = (row as f64 + 0.5) * cell;
            crossings.clear();
            for polygon in polygons {
                for (a, b) in closed_edges(polygon) {
                    // Half-open on y so shared vertices count once.
                    let (lo, hi, dir) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };
                    if y < lo.y || y >= hi.y {
                        continue;
                    }
                    let x = lo.x + (y - lo.y) / (hi.y - lo.y) * (hi.x - lo.x);
                    crossings.push((x, dir));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            let mut enter = 0.0;
            for &(x, dir) in &crossings {
                let was_inside = winding != 0;
                winding += dir;
                if !was_inside && winding != 0 {
                    enter = x;
                } else if was_inside && winding == 0 {
                    let start = (enter / cell - 0.5).ceil() as i64;
                    let end = (x / cell - 0.5).ceil() as i64;
                    region.push_span(row, start, end);
                }
            }
        }
        region.normalize();
        region
    }

    /// All cells within `radius` of a polyline. A single point yields a disk.
    pub fn from_polyline(points: &[Point], radius: f64, cell: f64) -> Self {
        let mut region = Self::empty(cell);
        region.add_polyline(points, radius);
        region.normalize();
        region
    }

    /// Region of a closed lasso: its filled interior plus its outline dilated
    /// by `margin`.
    pub fn from_closed_path(path: &BezPath, margin: f64, cell: f64) -> Self {
        let polygons = flatten_polylines(path, FLATTEN_TOLERANCE);
        let mut region = Self::from_fill(&polygons, cell);
        for polygon in &polygons {
            let mut outline = polygon.clone();
            if let Some(first) = polygon.first() {
                outline.push(*first);
            }
            region.add_polyline(&outline, margin);
        }
        region.normalize();
        region
    }

    /// Region of an open stroke path dilated by `radius`.
    pub fn from_stroke_path(path: &BezPath, radius: f64, cell: f64) -> Self {
        let mut region = Self::empty(cell);
        for polyline in flatten_polylines(path, FLATTEN_TOLERANCE) {
            region.add_polyline(&polyline, radius);
        }
        region.normalize();
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bounding box of the covered cells, in canvas units.
    pub fn bounds(&self) -> Option<Rect> {
        let (&first, _) = self.rows.first_key_value()?;
        let (&last, _) = self.rows.last_key_value()?;
        let x0 = self.rows.values().filter_map(|spans| spans.first()).map(|s| s.start).min()?;
        let x1 = self.rows.values().filter_map(|spans| spans.last()).map(|s| s.end).max()?;
        Some(Rect::new(
            x0 as f64 * self.cell,
            first as f64 * self.cell,
            x1 as f64 * self.cell,
            (last + 1) as f64 * self.cell,
        ))
    }

    /// Whether the cell containing `point` is covered.
    pub fn contains(&self, point: Point) -> bool {
        let row = (point.y / self.cell).floor() as i64;
        let col = (point.x / self.cell).floor() as i64;
        self.rows
            .get(&row)
            .is_some_and(|spans| spans.iter().any(|s| s.start <= col && col < s.end))
    }

    /// Whether the two regions share at least one cell.
    pub fn intersects(&self, other: &Region) -> bool {
        debug_assert!((self.cell - other.cell).abs() < f64::EPSILON);
        let (small, large) = if self.rows.len() <= other.rows.len() { (self, other) } else { (other, self) };
        small.rows.iter().any(|(row, spans)| {
            large
                .rows
                .get(row)
                .is_some_and(|other_spans| spans_overlap(spans, other_spans))
        })
    }

    /// Number of covered cells.
    pub fn area(&self) -> i64 {
        self.rows.values().flatten().map(|s| s.end - s.start).sum()
    }

    fn push_span(&mut self, row: i64, start: i64, end: i64) {
        if start < end {
            self.rows.entry(row).or_default().push(Span { start, end });
        }
    }

    fn add_polyline(&mut self, points: &[Point], radius: f64) {
        match points {
            [] => {}
            [single] => self.add_segment(*single, *single, radius),
            _ => {
                for pair in points.windows(2) {
                    self.add_segment(pair[0], pair[1], radius);
                }
            }
        }
    }

    /// Add the cells within `radius` of segment `ab`. The set is convex, so
    /// each row contributes a single run.
    fn add_segment(&mut self, a: Point, b: Point, radius: f64) {
        let cell = self.cell;
        let bounds = Rect::from_points(a, b).inflate(radius, radius);
        let first_row = (bounds.y0 / cell).floor() as i64;
        let last_row = (bounds.y1 / cell).floor() as i64;
        let first_col = (bounds.x0 / cell).floor() as i64;
        let last_col = (bounds.x1 / cell).floor() as i64;
        for row in first_row..=last_row {
            let y = (row as f64 + 0.5) * cell;
            let inside = |col: i64| point_to_segment_dist(Point::new((col as f64 + 0.5) * cell, y), a, b) <= radius;
            let Some(start) = (first_col..=last_col).find(|&col| inside(col)) else {
                continue;
            };
            let end = (start..=last_col).find(|&col| !inside(col)).unwrap_or(last_col + 1);
            self.push_span(row, start, end);
        }
    }

    /// Sort and merge spans in every row.
    fn normalize(&mut self) {
        for spans in self.rows.values_mut() {
            spans.sort_by_key(|s| s.start);
            let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
            for span in spans.drain(..) {
                match merged.last_mut() {
                    Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                    _ => merged.push(span),
                }
            }
            *spans = merged;
        }
        self.rows.retain(|_, spans| !spans.is_empty());
    }
}

/// Two sorted span lists share a cell.
fn spans_overlap(a: &[Span], b: &[Span]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].start < b[j].end && b[j].start < a[i].end {
            return true;
        }
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    false
}

/// Consecutive edges of a polygon, including the closing edge.
fn closed_edges(polygon: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

/// Minimum distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Flatten a path into polylines, one per subpath. Closing segments are not
/// repeated in the output.
pub fn flatten_polylines(path: &BezPath, tolerance: f64) -> Vec<Vec<Point>> {
    let mut polylines: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    kurbo::flatten(path, tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            if !current.is_empty() {
                polylines.push(std::mem::take(&mut current));
            }
            current.push(p);
        }
        PathEl::LineTo(p) => current.push(p),
        PathEl::ClosePath => {
            if current.len() > 1 && current.first() == current.last() {
                current.pop();
            }
        }
        _ => {}
    });
    if !current.is_empty() {
        polylines.push(current);
    }
    polylines
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-10);
        assert!((point_to_segment_dist(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-10);
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_fill_square() {
        let region = Region::from_fill(&[square(0.0, 0.0, 100.0, 100.0)], 1.0);
        assert_eq!(region.area(), 100 * 100);
        assert_eq!(region.bounds(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(region.contains(Point::new(50.0, 50.0)));
        assert!(!region.contains(Point::new(150.0, 50.0)));
    }

    #[test]
    fn test_fill_nonzero_winding() {
        // Two overlapping squares with the same orientation: the overlap stays filled.
        let region = Region::from_fill(&[square(0.0, 0.0, 20.0, 20.0), square(10.0, 10.0, 30.0, 30.0)], 1.0);
        assert!(region.contains(Point::new(15.0, 15.0)));
        assert_eq!(region.area(), 400 + 400 - 100);
    }

    #[test]
    fn test_fill_empty_polygon() {
        assert!(Region::from_fill(&[], 1.0).is_empty());
    }

    #[test]
    fn test_polyline_dilation() {
        let region = Region::from_polyline(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)], 5.0, 1.0);
        assert!(region.contains(Point::new(50.0, 4.0)));
        assert!(region.contains(Point::new(-4.0, 0.5)));
        assert!(!region.contains(Point::new(50.0, 6.0)));
        assert!(!region.contains(Point::new(110.0, 0.0)));
    }

    #[test]
    fn test_single_point_is_disk() {
        let region = Region::from_polyline(&[Point::new(10.0, 10.0)], 3.0, 1.0);
        assert!(region.contains(Point::new(10.0, 10.0)));
        assert!(region.contains(Point::new(12.2, 10.0)));
        assert!(!region.contains(Point::new(14.0, 14.0)));
    }

    #[test]
    fn test_intersects() {
        let lasso = Region::from_fill(&[square(0.0, 0.0, 100.0, 100.0)], 1.0);
        let inside = Region::from_polyline(&[Point::new(40.0, 40.0), Point::new(60.0, 60.0)], 2.0, 1.0);
        let outside = Region::from_polyline(&[Point::new(200.0, 200.0), Point::new(250.0, 250.0)], 2.0, 1.0);
        assert!(lasso.intersects(&inside));
        assert!(inside.intersects(&lasso));
        assert!(!lasso.intersects(&outside));
    }

    #[test]
    fn test_closed_path_includes_outline_margin() {
        let path = Rect::new(0.0, 0.0, 50.0, 50.0).to_path(0.1);
        let region = Region::from_closed_path(&path, 2.0, 1.0);
        assert!(region.contains(Point::new(25.0, 25.0)));
        assert!(region.contains(Point::new(51.2, 25.0)));
        assert!(!region.contains(Point::new(54.0, 25.0)));
    }

    #[test]
    fn test_flatten_polylines_subpaths() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.move_to((20.0, 0.0));
        path.line_to((30.0, 0.0));
        path.line_to((30.0, 10.0));
        path.close_path();
        let polylines = flatten_polylines(&path, FLATTEN_TOLERANCE);
        assert_eq!(polylines.len(), 2);
        assert_eq!(polylines[0].len(), 2);
        assert_eq!(polylines[1].len(), 3);
    }
}
