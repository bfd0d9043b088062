//! Pointer input events
//!
//! Host-neutral pointer samples in surface pixels. `Cancel` covers lost
//! pointer capture and is handled like a release.

use pdf_annotator_core::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// Pointer capture lost mid-gesture
    Cancel,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
    pub pressure: Option<f32>,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self { phase, x, y, pressure: None }
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }

    pub fn cancel(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Cancel, x, y)
    }

    pub fn double_click(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::DoubleClick, x, y)
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Sample as a captured stroke point
    pub fn point(&self) -> Point {
        let point = Point::new(self.x, self.y);
        match self.pressure {
            Some(pressure) => point.with_pressure(pressure),
            None => point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_carries_pressure() {
        let event = PointerEvent::moved(3.0, 4.0).with_pressure(0.5);
        assert_eq!(event.phase, PointerPhase::Move);
        assert_eq!(event.point(), Point::new(3.0, 4.0).with_pressure(0.5));
        assert_eq!(PointerEvent::down(1.0, 2.0).point().pressure, None);
    }
}
