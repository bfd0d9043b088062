//! Error types shared across the annotation engine
//!
//! Per-operation problems (malformed records, degenerate geometry, history
//! underflow) are recovered locally and never surface here. This enum only
//! carries failures the host application has to deal with.

use std::io;

/// Errors surfaced to the surrounding application
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    /// A drawing surface could not be allocated
    #[error("unable to acquire a {width}x{height} drawing surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("export failed: {0}")]
    Export(String),
}

/// Result type for engine operations
pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
