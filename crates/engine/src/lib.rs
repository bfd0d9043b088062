//! PDF Annotator Engine
//!
//! Pointer pipeline tying the annotation store, stroke rasterizer and shape
//! layer together for one open document.

pub mod engine;
pub mod input;

pub use engine::AnnotationEngine;
pub use input::{PointerEvent, PointerPhase};
