//! Geometry kernel
//!
//! Pure functions over point sequences: distances, segment proximity,
//! bounding boxes, Douglas-Peucker simplification and eraser splitting.
//! Degenerate input (zero-length segments, empty paths) yields sentinel
//! values instead of errors.

use crate::annotation::{Point, StrokePath};

/// Determinant magnitude below which two segments count as parallel
const PARALLEL_EPSILON: f32 = 1e-10;

/// Squared length below which a segment counts as a single point
const DEGENERATE_LENGTH_SQ: f32 = 1e-12;

/// A line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// Axis-aligned bounding box in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Grow the box by `amount` on every side
    pub fn expand(&self, amount: f32) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    /// Inclusive overlap test
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Distance from a point to a segment
///
/// The projection parameter is clamped to [0, 1]; zero-length segments reduce
/// to point-to-point distance.
pub fn point_to_segment_distance(point: &Point, start: &Point, end: &Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < DEGENERATE_LENGTH_SQ {
        return point.distance_to(start);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    let closest = Point::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest)
}

/// Proper intersection test via the 2x2 system on the segment parameters
///
/// Parallel and coincident segments report `false`.
pub fn segments_intersect(seg1: &Segment, seg2: &Segment) -> bool {
    let (a1, a2) = (&seg1.start, &seg1.end);
    let (b1, b2) = (&seg2.start, &seg2.end);

    let denominator = (b2.y - b1.y) * (a2.x - a1.x) - (b2.x - b1.x) * (a2.y - a1.y);
    if denominator.abs() < PARALLEL_EPSILON {
        return false;
    }

    let ua = ((b2.x - b1.x) * (a1.y - b1.y) - (b2.y - b1.y) * (a1.x - b1.x)) / denominator;
    let ub = ((a2.x - a1.x) * (a1.y - b1.y) - (a2.y - a1.y) * (a1.x - b1.x)) / denominator;

    (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub)
}

/// True when two segments cross or come within `tolerance` of each other
pub fn segments_within_tolerance(seg1: &Segment, seg2: &Segment, tolerance: f32) -> bool {
    let min_distance = point_to_segment_distance(&seg1.start, &seg2.start, &seg2.end)
        .min(point_to_segment_distance(&seg1.end, &seg2.start, &seg2.end))
        .min(point_to_segment_distance(&seg2.start, &seg1.start, &seg1.end))
        .min(point_to_segment_distance(&seg2.end, &seg1.start, &seg1.end));

    min_distance <= tolerance || segments_intersect(seg1, seg2)
}

/// Bounding box of a point sequence, `None` for an empty sequence
pub fn path_bounding_box(points: &[Point]) -> Option<BoundingBox> {
    let first = points.first()?;
    let init = BoundingBox::new(first.x, first.y, first.x, first.y);

    Some(points.iter().skip(1).fold(init, |bbox, p| BoundingBox {
        min_x: bbox.min_x.min(p.x),
        min_y: bbox.min_y.min(p.y),
        max_x: bbox.max_x.max(p.x),
        max_y: bbox.max_y.max(p.y),
    }))
}

/// Perpendicular distance from `p` to the line through `start` and `end`
fn perpendicular_distance(p: &Point, start: &Point, end: &Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < DEGENERATE_LENGTH_SQ {
        return p.distance_to(start);
    }

    (dx * (start.y - p.y) - (start.x - p.x) * dy).abs() / length_sq.sqrt()
}

/// Douglas-Peucker simplification
///
/// Keeps only points whose perpendicular distance from the chord of their
/// sub-path exceeds `tolerance`. Paths of two points or fewer come back
/// unchanged. Applying it twice with the same tolerance is a no-op.
pub fn simplify_path(points: &[Point], tolerance: f32) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    mark_simplified(points, 0, points.len() - 1, tolerance, &mut keep);

    points.iter().zip(keep).filter(|(_, kept)| *kept).map(|(p, _)| *p).collect()
}

fn mark_simplified(points: &[Point], first: usize, last: usize, tolerance: f32, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let (start, end) = (&points[first], &points[last]);
    let mut max_distance = 0.0;
    let mut max_index = first;
    for (index, point) in points.iter().enumerate().take(last).skip(first + 1) {
        let distance = perpendicular_distance(point, start, end);
        if distance > max_distance {
            max_distance = distance;
            max_index = index;
        }
    }

    if max_distance > tolerance {
        keep[max_index] = true;
        mark_simplified(points, first, max_index, tolerance, keep);
        mark_simplified(points, max_index, last, tolerance, keep);
    }
}

/// Segments of a point sequence; a lone point becomes one zero-length segment
fn segments_of(points: &[Point]) -> Vec<Segment> {
    match points {
        [] => Vec::new(),
        [only] => vec![Segment::new(*only, *only)],
        _ => points.windows(2).map(|pair| Segment::new(pair[0], pair[1])).collect(),
    }
}

/// Subtract an eraser stroke from an ink stroke
///
/// Every segment of `stroke` that comes within `tolerance` of any eraser
/// segment is removed. Contiguous runs of surviving points with at least two
/// points become independent subpaths carrying the original attributes.
/// A stroke whose tolerance-expanded bounding box misses the eraser comes back
/// as `[stroke]` untouched.
pub fn split_stroke_by_eraser(
    stroke: &StrokePath,
    eraser: &StrokePath,
    tolerance: f32,
) -> Vec<StrokePath> {
    let (Some(stroke_box), Some(eraser_box)) =
        (path_bounding_box(&stroke.points), path_bounding_box(&eraser.points))
    else {
        return vec![stroke.clone()];
    };

    if !stroke_box.expand(tolerance).intersects(&eraser_box) {
        return vec![stroke.clone()];
    }

    let eraser_segments = segments_of(&eraser.points);
    let mut subpaths = Vec::new();
    let mut run: Vec<Point> = Vec::new();
    let mut touched = false;

    for pair in stroke.points.windows(2) {
        let segment = Segment::new(pair[0], pair[1]);
        let erased = eraser_segments
            .iter()
            .any(|eraser_segment| segments_within_tolerance(&segment, eraser_segment, tolerance));

        if erased {
            touched = true;
            flush_run(stroke, &mut run, &mut subpaths);
        } else {
            if run.is_empty() {
                run.push(pair[0]);
            }
            run.push(pair[1]);
        }
    }

    if !touched {
        return vec![stroke.clone()];
    }

    flush_run(stroke, &mut run, &mut subpaths);
    subpaths
}

fn flush_run(stroke: &StrokePath, run: &mut Vec<Point>, out: &mut Vec<StrokePath>) {
    let points = std::mem::take(run);
    if points.len() >= StrokePath::MIN_POINTS {
        out.push(stroke.with_points(points));
    }
}
