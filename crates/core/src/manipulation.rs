//! Shape manipulation handles and transforms
//!
//! Handles are small control points around a selected shape's box. They are
//! laid out in the shape's unrotated frame and then rotated with it, so hit
//! testing and dragging behave the same at any angle.

use crate::annotation::{ShapeId, ShapeKind, ShapeObject};

/// Type of manipulation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    /// Corner handles for resizing
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,

    /// Edge handles for resizing in one dimension
    Top,
    Bottom,
    Left,
    Right,

    /// Rotation handle above the shape
    Rotate,

    /// Arrow endpoints
    Start,
    End,
}

/// Manipulation handle with position and type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationHandle {
    pub handle_type: HandleType,

    /// Position in surface pixels
    pub position: (f32, f32),

    /// Radius of the hit area
    pub size: f32,

    pub shape_id: ShapeId,
}

impl ManipulationHandle {
    pub fn new(handle_type: HandleType, position: (f32, f32), size: f32, shape_id: ShapeId) -> Self {
        Self { handle_type, position, size, shape_id }
    }

    /// Check if a point hits this handle
    pub fn hit_test(&self, x: f32, y: f32, tolerance: f32) -> bool {
        let dx = x - self.position.0;
        let dy = y - self.position.1;
        (dx * dx + dy * dy).sqrt() <= self.size + tolerance
    }
}

/// Generate manipulation handles for a shape
///
/// Arrows get their two endpoints; every other variant gets four corners,
/// four edges and a rotation handle `rotation_offset` above the top edge.
pub fn generate_handles(
    shape: &ShapeObject,
    handle_size: f32,
    rotation_offset: f32,
) -> Vec<ManipulationHandle> {
    let id = shape.id;

    if let Some([x1, y1, x2, y2]) = shape.arrow_points() {
        return vec![
            ManipulationHandle::new(HandleType::Start, (x1, y1), handle_size, id),
            ManipulationHandle::new(HandleType::End, (x2, y2), handle_size, id),
        ];
    }

    let (left, top) = (shape.x, shape.y);
    let (right, bottom) = (shape.x + shape.width, shape.y + shape.height);
    let (center_x, center_y) = shape.center();

    let local = [
        (HandleType::TopLeft, (left, top)),
        (HandleType::TopRight, (right, top)),
        (HandleType::BottomLeft, (left, bottom)),
        (HandleType::BottomRight, (right, bottom)),
        (HandleType::Top, (center_x, top)),
        (HandleType::Bottom, (center_x, bottom)),
        (HandleType::Left, (left, center_y)),
        (HandleType::Right, (right, center_y)),
        (HandleType::Rotate, (center_x, top - rotation_offset)),
    ];

    local
        .into_iter()
        .map(|(handle_type, (x, y))| {
            ManipulationHandle::new(handle_type, shape.to_world(x, y), handle_size, id)
        })
        .collect()
}

/// Topmost handle under a point
pub fn handle_at(
    handles: &[ManipulationHandle],
    x: f32,
    y: f32,
    tolerance: f32,
) -> Option<HandleType> {
    handles.iter().find(|handle| handle.hit_test(x, y, tolerance)).map(|handle| handle.handle_type)
}

/// Resize or re-point `shape` by dragging `handle` to a surface-space point
///
/// `original` is the shape as it was when the drag started. Box shapes are
/// resized in their unrotated frame with the opposite edge held fixed; the
/// box never collapses below `min_size`. Circles stay square.
pub fn apply_handle_drag(
    original: &ShapeObject,
    handle: HandleType,
    x: f32,
    y: f32,
    min_size: f32,
) -> ShapeObject {
    let mut shape = original.clone();

    if let Some([x1, y1, x2, y2]) = original.arrow_points() {
        match handle {
            HandleType::Start => shape.set_arrow_points([x, y, x2, y2]),
            HandleType::End => shape.set_arrow_points([x1, y1, x, y]),
            _ => {}
        }
        return shape;
    }

    if handle == HandleType::Rotate {
        shape.angle = rotation_towards(original, x, y);
        return shape;
    }

    let (lx, ly) = original.to_local(x, y);
    let mut left = original.x;
    let mut top = original.y;
    let mut right = original.x + original.width;
    let mut bottom = original.y + original.height;

    match handle {
        HandleType::TopLeft => (left, top) = (lx.min(right - min_size), ly.min(bottom - min_size)),
        HandleType::TopRight => (right, top) = (lx.max(left + min_size), ly.min(bottom - min_size)),
        HandleType::BottomLeft => {
            (left, bottom) = (lx.min(right - min_size), ly.max(top + min_size))
        }
        HandleType::BottomRight => {
            (right, bottom) = (lx.max(left + min_size), ly.max(top + min_size))
        }
        HandleType::Top => top = ly.min(bottom - min_size),
        HandleType::Bottom => bottom = ly.max(top + min_size),
        HandleType::Left => left = lx.min(right - min_size),
        HandleType::Right => right = lx.max(left + min_size),
        HandleType::Rotate | HandleType::Start | HandleType::End => {}
    }

    if matches!(original.kind, ShapeKind::Circle) {
        let side = (right - left).max(bottom - top);
        if matches!(handle, HandleType::TopLeft | HandleType::BottomLeft | HandleType::Left) {
            left = right - side;
        } else {
            right = left + side;
        }
        if matches!(handle, HandleType::TopLeft | HandleType::TopRight | HandleType::Top) {
            top = bottom - side;
        } else {
            bottom = top + side;
        }
    }

    // Keep the fixed side where it was on screen: resizing moves the center,
    // which would otherwise swing a rotated box around.
    let (anchor_lx, anchor_ly) = anchor_for(handle, original);
    let anchor_world = original.to_world(anchor_lx, anchor_ly);

    shape.x = left;
    shape.y = top;
    shape.width = right - left;
    shape.height = bottom - top;

    let anchor_after = shape.to_world(anchor_lx, anchor_ly);
    shape.x += anchor_world.0 - anchor_after.0;
    shape.y += anchor_world.1 - anchor_after.1;
    shape
}

/// Local-frame point that stays fixed while dragging `handle`
fn anchor_for(handle: HandleType, shape: &ShapeObject) -> (f32, f32) {
    let (left, top) = (shape.x, shape.y);
    let (right, bottom) = (shape.x + shape.width, shape.y + shape.height);
    let (cx, cy) = shape.center();
    match handle {
        HandleType::TopLeft => (right, bottom),
        HandleType::TopRight => (left, bottom),
        HandleType::BottomLeft => (right, top),
        HandleType::BottomRight => (left, top),
        HandleType::Top => (cx, bottom),
        HandleType::Bottom => (cx, top),
        HandleType::Left => (right, cy),
        HandleType::Right => (left, cy),
        HandleType::Rotate | HandleType::Start | HandleType::End => (cx, cy),
    }
}

/// Angle (degrees) that points the shape's top edge towards `(x, y)`
pub fn rotation_towards(shape: &ShapeObject, x: f32, y: f32) -> f32 {
    let (cx, cy) = shape.center();
    let degrees = (x - cx).atan2(cy - y).to_degrees();
    if degrees < 0.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ShapeStyle;

    fn rect() -> ShapeObject {
        ShapeObject::new(1, ShapeKind::Rectangle, 100.0, 100.0, 50.0, 20.0, ShapeStyle::default())
    }

    #[test]
    fn test_box_handles() {
        let shape = rect();
        let handles = generate_handles(&shape, 5.0, 30.0);
        assert_eq!(handles.len(), 9);
        assert_eq!(handles[0].position, (100.0, 100.0));
        assert_eq!(handles[3].position, (150.0, 120.0));
        assert_eq!(handles[8].handle_type, HandleType::Rotate);
        assert_eq!(handles[8].position, (125.0, 70.0));
    }

    #[test]
    fn test_arrow_handles() {
        let arrow = ShapeObject::arrow(1, (0.0, 0.0), (50.0, 50.0), ShapeStyle::default());
        let handles = generate_handles(&arrow, 5.0, 30.0);
        assert_eq!(handles.len(), 2);
        assert_eq!(handle_at(&handles, 49.0, 51.0, 0.0), Some(HandleType::End));
        assert_eq!(handle_at(&handles, 25.0, 25.0, 0.0), None);
    }

    #[test]
    fn test_corner_resize() {
        let resized = apply_handle_drag(&rect(), HandleType::BottomRight, 200.0, 160.0, 5.0);
        assert_eq!((resized.x, resized.y, resized.width, resized.height), (100.0, 100.0, 100.0, 60.0));
    }

    #[test]
    fn test_resize_clamps_to_min_size() {
        let resized = apply_handle_drag(&rect(), HandleType::Left, 400.0, 110.0, 5.0);
        assert_eq!(resized.width, 5.0);
        assert!((resized.x - 145.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_handle() {
        let shape = rect();
        // Directly right of the center is a quarter turn
        let rotated = apply_handle_drag(&shape, HandleType::Rotate, 200.0, 110.0, 5.0);
        assert!((rotated.angle - 90.0).abs() < 1e-3);
        assert_eq!((rotated.x, rotated.width), (shape.x, shape.width));
    }

    #[test]
    fn test_arrow_endpoint_drag() {
        let arrow = ShapeObject::arrow(1, (0.0, 0.0), (50.0, 50.0), ShapeStyle::default());
        let moved = apply_handle_drag(&arrow, HandleType::Start, 10.0, 60.0, 5.0);
        assert_eq!(moved.arrow_points(), Some([10.0, 60.0, 50.0, 50.0]));
    }

    #[test]
    fn test_circle_stays_square() {
        let circle =
            ShapeObject::new(1, ShapeKind::Circle, 0.0, 0.0, 20.0, 20.0, ShapeStyle::default());
        let resized = apply_handle_drag(&circle, HandleType::BottomRight, 50.0, 30.0, 5.0);
        assert_eq!(resized.width, resized.height);
        assert_eq!(resized.width, 50.0);
    }
}
