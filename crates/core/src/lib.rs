//! PDF Annotator Core Library
//!
//! Annotation model, geometry kernel, history and the interactive shape
//! layer. Nothing in this crate touches pixels; see the render crate for
//! rasterization.

pub mod annotation;
pub mod config;
pub mod coords;
pub mod error;
pub mod geometry;
pub mod history;
pub mod manipulation;
pub mod persistence;
pub mod shape_layer;
pub mod stamp;
pub mod store;
pub mod text_edit;

pub use annotation::{
    Color, ParseColorError, Point, ShapeId, ShapeKind, ShapeObject, ShapeStyle, StrokePath,
    StrokeTool,
};
pub use config::{EngineConfig, Tool, ToolContext, ToolSettings};
pub use coords::SurfaceSize;
pub use error::{AnnotatorError, AnnotatorResult};
pub use geometry::{BoundingBox, Segment};
pub use history::{HistoryEntry, HistoryManager, DEFAULT_HISTORY_CAP};
pub use manipulation::{generate_handles, HandleType, ManipulationHandle};
pub use persistence::{AnnotationSink, AnnotationSnapshot, DocumentKey, JsonSidecarSink};
pub use shape_layer::{LayerResponse, ShapeChange, ShapeLayer};
pub use stamp::{StampCatalog, StampDefinition};
pub use store::{AnnotationStore, PageSlots};
pub use text_edit::{EditRequest, EditResult};
