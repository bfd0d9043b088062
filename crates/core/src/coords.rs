//! Coordinate normalization
//!
//! Maps between surface pixel coordinates and page-relative [0, 1] space.
//! Persisted points and shapes carry relative coordinates as their primary
//! truth; absolute coordinates are regenerated from them whenever the surface
//! size or zoom changes, never the other way round.

use crate::annotation::{Point, ShapeKind, ShapeObject};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a raster surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (or negative)
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

fn ratio(value: f32, extent: f32) -> f32 {
    if extent > 0.0 {
        value / extent
    } else {
        0.0
    }
}

/// Surface pixels to page-relative coordinates
///
/// A zero-sized dimension yields a relative coordinate of 0 for that axis.
pub fn to_relative(x: f32, y: f32, size: SurfaceSize) -> (f32, f32) {
    (ratio(x, size.width), ratio(y, size.height))
}

/// Page-relative coordinates to surface pixels
pub fn to_absolute(relative_x: f32, relative_y: f32, size: SurfaceSize) -> (f32, f32) {
    (relative_x * size.width, relative_y * size.height)
}

/// Attach relative coordinates to a captured point
pub fn normalize_point(point: Point, size: SurfaceSize) -> Point {
    let (relative_x, relative_y) = to_relative(point.x, point.y, size);
    point.with_relative(relative_x, relative_y)
}

/// Regenerate a point's absolute coordinates from its relative ones
///
/// Points that were never normalized keep their captured `x`/`y`.
pub fn resolve_point(point: Point, size: SurfaceSize) -> Point {
    match point.relative() {
        Some((relative_x, relative_y)) => {
            let (x, y) = to_absolute(relative_x, relative_y, size);
            Point { x, y, ..point }
        }
        None => point,
    }
}

pub fn resolve_points(points: &[Point], size: SurfaceSize) -> Vec<Point> {
    points.iter().map(|p| resolve_point(*p, size)).collect()
}

/// Fill a shape's relative fields from its absolute geometry
pub fn normalize_shape(shape: &mut ShapeObject, size: SurfaceSize) {
    let (relative_x, relative_y) = to_relative(shape.x, shape.y, size);
    let (relative_width, relative_height) = to_relative(shape.width, shape.height, size);
    shape.relative_x = Some(relative_x);
    shape.relative_y = Some(relative_y);
    shape.relative_width = Some(relative_width);
    shape.relative_height = Some(relative_height);

    if let ShapeKind::Arrow { points, relative_points } = &mut shape.kind {
        let (x1, y1) = to_relative(points[0], points[1], size);
        let (x2, y2) = to_relative(points[2], points[3], size);
        *relative_points = Some([x1, y1, x2, y2]);
    }
}

/// Regenerate a shape's absolute geometry from its relative fields
///
/// Shapes that were never normalized keep their stored `x`/`y`/size.
pub fn resolve_shape(shape: &mut ShapeObject, size: SurfaceSize) {
    if let ShapeKind::Arrow { relative_points: Some(rel), .. } = &shape.kind {
        let (x1, y1) = to_absolute(rel[0], rel[1], size);
        let (x2, y2) = to_absolute(rel[2], rel[3], size);
        shape.set_arrow_points([x1, y1, x2, y2]);
        return;
    }

    if let Some((relative_x, relative_y)) = shape.relative_position() {
        (shape.x, shape.y) = to_absolute(relative_x, relative_y, size);
    }
    if let Some((relative_width, relative_height)) = shape.relative_size() {
        (shape.width, shape.height) = to_absolute(relative_width, relative_height, size);
    }
}

/// Ratio between `size` and the surface an absolute/relative pair was
/// captured on
///
/// Uses the horizontal axis when it carries information, the vertical one
/// otherwise. `None` when both coordinates are zero.
pub fn capture_scale(absolute: (f32, f32), relative: (f32, f32), size: SurfaceSize) -> Option<f32> {
    const MIN_EXTENT: f32 = 1e-6;
    if absolute.0.abs() > MIN_EXTENT && relative.0.abs() > MIN_EXTENT {
        return Some(size.width * relative.0 / absolute.0);
    }
    if absolute.1.abs() > MIN_EXTENT && relative.1.abs() > MIN_EXTENT {
        return Some(size.height * relative.1 / absolute.1);
    }
    None
}

/// Scale factor from a stored path's capture surface to `size`
pub fn path_capture_scale(points: &[Point], size: SurfaceSize) -> Option<f32> {
    points
        .iter()
        .find_map(|point| capture_scale((point.x, point.y), point.relative()?, size))
}

/// Scale factor from a stored shape's capture surface to `size`
pub fn shape_capture_scale(shape: &ShapeObject, size: SurfaceSize) -> Option<f32> {
    shape
        .relative_size()
        .and_then(|relative| capture_scale((shape.width, shape.height), relative, size))
        .or_else(|| {
            shape
                .relative_position()
                .and_then(|relative| capture_scale((shape.x, shape.y), relative, size))
        })
}

/// Carry absolute geometry from one surface size to another
///
/// For transient shapes (drag previews and pre-drag originals) whose relative
/// fields may be stale or missing.
pub fn rescale_shape(shape: &mut ShapeObject, from: SurfaceSize, to: SurfaceSize) {
    normalize_shape(shape, from);
    resolve_shape(shape, to);
}

/// Carry a surface point from one surface size to another
pub fn rescale_xy(x: f32, y: f32, from: SurfaceSize, to: SurfaceSize) -> (f32, f32) {
    let (relative_x, relative_y) = to_relative(x, y, from);
    to_absolute(relative_x, relative_y, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ShapeStyle;

    #[test]
    fn test_round_trip() {
        let sizes = [SurfaceSize::new(612.0, 792.0), SurfaceSize::new(1.0, 3.0), SurfaceSize::new(4096.0, 17.5)];
        let points = [(0.0, 0.0), (12.5, 700.25), (611.9, 0.01), (-3.0, 1000.0)];
        for size in sizes {
            for (x, y) in points {
                let (rx, ry) = to_relative(x, y, size);
                let (ax, ay) = to_absolute(rx, ry, size);
                assert!((ax - x).abs() < 1e-3 && (ay - y).abs() < 1e-3, "{x},{y} at {size:?}");
            }
        }
    }

    #[test]
    fn test_zero_sized_surface_yields_zero() {
        assert_eq!(to_relative(50.0, 20.0, SurfaceSize::new(0.0, 100.0)), (0.0, 0.2));
        assert_eq!(to_relative(50.0, 20.0, SurfaceSize::default()), (0.0, 0.0));
        assert!(SurfaceSize::default().is_degenerate());
    }

    #[test]
    fn test_resolve_point_prefers_relative() {
        let captured = normalize_point(Point::new(50.0, 25.0), SurfaceSize::new(100.0, 100.0));
        let zoomed = resolve_point(captured, SurfaceSize::new(200.0, 400.0));
        assert_eq!((zoomed.x, zoomed.y), (100.0, 100.0));

        let raw = resolve_point(Point::new(7.0, 8.0), SurfaceSize::new(200.0, 400.0));
        assert_eq!((raw.x, raw.y), (7.0, 8.0));
    }

    #[test]
    fn test_shape_normalize_and_resolve() {
        let size = SurfaceSize::new(200.0, 100.0);
        let mut arrow = ShapeObject::arrow(1, (20.0, 10.0), (180.0, 90.0), ShapeStyle::default());
        normalize_shape(&mut arrow, size);
        assert_eq!(arrow.relative_x, Some(0.1));

        resolve_shape(&mut arrow, SurfaceSize::new(400.0, 200.0));
        assert_eq!(arrow.arrow_points(), Some([40.0, 20.0, 360.0, 180.0]));

        let mut rect = ShapeObject::new(1, ShapeKind::Rectangle, 50.0, 25.0, 100.0, 50.0, ShapeStyle::default());
        normalize_shape(&mut rect, size);
        resolve_shape(&mut rect, SurfaceSize::new(100.0, 50.0));
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (25.0, 12.5, 50.0, 25.0));
    }

    #[test]
    fn test_unnormalized_shape_keeps_absolute_geometry() {
        let mut rect = ShapeObject::new(1, ShapeKind::Rectangle, 12.0, 8.0, 30.0, 20.0, ShapeStyle::default());
        resolve_shape(&mut rect, SurfaceSize::new(400.0, 400.0));
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (12.0, 8.0, 30.0, 20.0));
    }

    #[test]
    fn test_capture_scale() {
        let captured = SurfaceSize::new(100.0, 50.0);
        let point = normalize_point(Point::new(25.0, 10.0), captured);
        assert_eq!(path_capture_scale(&[point], SurfaceSize::new(400.0, 200.0)), Some(4.0));

        // Origin carries no scale information; the next point does
        let origin = normalize_point(Point::new(0.0, 0.0), captured);
        assert_eq!(path_capture_scale(&[origin, point], SurfaceSize::new(50.0, 25.0)), Some(0.5));
        assert_eq!(path_capture_scale(&[origin], SurfaceSize::new(50.0, 25.0)), None);
        assert_eq!(path_capture_scale(&[Point::new(3.0, 4.0)], SurfaceSize::new(50.0, 25.0)), None);

        let mut rect = ShapeObject::new(1, ShapeKind::Rectangle, 0.0, 0.0, 20.0, 10.0, ShapeStyle::default());
        assert_eq!(shape_capture_scale(&rect, SurfaceSize::new(200.0, 100.0)), None);
        normalize_shape(&mut rect, captured);
        assert_eq!(shape_capture_scale(&rect, SurfaceSize::new(200.0, 100.0)), Some(2.0));
    }

    #[test]
    fn test_rescale_shape_between_surfaces() {
        let mut rect = ShapeObject::new(1, ShapeKind::Rectangle, 10.0, 20.0, 30.0, 40.0, ShapeStyle::default());
        rescale_shape(&mut rect, SurfaceSize::new(100.0, 100.0), SurfaceSize::new(200.0, 50.0));
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (20.0, 10.0, 60.0, 20.0));
        assert_eq!(rescale_xy(50.0, 50.0, SurfaceSize::new(100.0, 100.0), SurfaceSize::new(200.0, 50.0)), (100.0, 25.0));
    }
}
