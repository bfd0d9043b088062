//! Inline text editing protocol
//!
//! The engine never draws an input widget itself. When a text-bearing shape
//! needs editing it hands the host an [`EditRequest`] with the initial value
//! and the box to position an input over; the host answers with an
//! [`EditResult`].

use crate::annotation::{ShapeId, ShapeKind, ShapeObject};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// Request for the host to open a text input over a shape
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub shape_id: ShapeId,
    pub initial_value: String,
    /// Area to cover with the input, in surface pixels
    pub bounds: BoundingBox,
    /// Rotation of the shape in degrees
    pub angle: f32,
    pub font_family: String,
    pub font_size: f32,
    /// True for a freshly placed object that has never been committed
    pub is_placeholder: bool,
}

/// Host answer to an [`EditRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "text", rename_all = "lowercase")]
pub enum EditResult {
    /// Apply this text; empty text deletes the object
    Commit(String),
    /// Escape: revert, or drop an uncommitted placeholder
    Cancel,
}

/// State of the single active edit session
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    /// Shape as it was before editing started
    pub original: ShapeObject,
    /// True when the shape has not been stored yet
    pub is_placeholder: bool,
}

impl EditSession {
    pub fn new(original: ShapeObject, is_placeholder: bool) -> Self {
        Self { original, is_placeholder }
    }

    pub fn shape_id(&self) -> ShapeId {
        self.original.id
    }

    /// Build the request the host receives for this session
    pub fn request(&self) -> EditRequest {
        let (font_family, initial_value) = match &self.original.kind {
            ShapeKind::Text { text, font_family } | ShapeKind::Note { text, font_family, .. } => {
                (font_family.clone(), text.clone())
            }
            _ => (String::new(), String::new()),
        };
        let shape = &self.original;

        EditRequest {
            shape_id: shape.id,
            initial_value,
            bounds: BoundingBox::new(shape.x, shape.y, shape.x + shape.width, shape.y + shape.height),
            angle: shape.angle,
            font_family,
            font_size: shape.style.font_size,
            is_placeholder: self.is_placeholder,
        }
    }
}

/// What committing or cancelling a session does to the shape
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// First commit of a placeholder
    Create(ShapeObject),
    Update(ShapeObject),
    Delete(ShapeId),
    /// Restore the pre-edit shape (nothing reaches the store)
    Revert(ShapeObject),
    /// Uncommitted placeholder dropped without trace
    Discard(ShapeId),
}

/// Resolve a session with the host's answer
pub fn resolve_edit(session: EditSession, result: EditResult) -> EditOutcome {
    let id = session.shape_id();
    match result {
        EditResult::Commit(text) if text.trim().is_empty() => {
            if session.is_placeholder {
                EditOutcome::Discard(id)
            } else {
                EditOutcome::Delete(id)
            }
        }
        EditResult::Commit(text) => {
            let mut shape = session.original;
            shape.set_text(text);
            if session.is_placeholder {
                EditOutcome::Create(shape)
            } else {
                EditOutcome::Update(shape)
            }
        }
        EditResult::Cancel if session.is_placeholder => EditOutcome::Discard(id),
        EditResult::Cancel => EditOutcome::Revert(session.original),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ShapeStyle;

    fn text_shape(text: &str) -> ShapeObject {
        ShapeObject::new(
            1,
            ShapeKind::Text { text: text.into(), font_family: "Helvetica".into() },
            10.0,
            20.0,
            100.0,
            30.0,
            ShapeStyle::default(),
        )
    }

    #[test]
    fn test_request_mirrors_shape() {
        let session = EditSession::new(text_shape("Type here"), true);
        let request = session.request();
        assert_eq!(request.initial_value, "Type here");
        assert_eq!(request.bounds, BoundingBox::new(10.0, 20.0, 110.0, 50.0));
        assert!(request.is_placeholder);
    }

    #[test]
    fn test_placeholder_commit_creates() {
        let outcome = resolve_edit(EditSession::new(text_shape("Type here"), true), EditResult::Commit("hi".into()));
        match outcome {
            EditOutcome::Create(shape) => assert_eq!(shape.kind.text(), Some("hi")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_empty_commit() {
        let placeholder = EditSession::new(text_shape("Type here"), true);
        assert!(matches!(resolve_edit(placeholder, EditResult::Commit("  ".into())), EditOutcome::Discard(_)));

        let stored = EditSession::new(text_shape("old"), false);
        assert!(matches!(resolve_edit(stored, EditResult::Commit(String::new())), EditOutcome::Delete(_)));
    }

    #[test]
    fn test_cancel() {
        let stored = text_shape("old");
        match resolve_edit(EditSession::new(stored.clone(), false), EditResult::Cancel) {
            EditOutcome::Revert(shape) => assert_eq!(shape, stored),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(
            resolve_edit(EditSession::new(text_shape("Type here"), true), EditResult::Cancel),
            EditOutcome::Discard(_)
        ));
    }

    #[test]
    fn test_edit_result_json() {
        let commit: EditResult = serde_json::from_str(r#"{"action": "commit", "text": "x"}"#).unwrap();
        assert_eq!(commit, EditResult::Commit("x".into()));
        let cancel: EditResult = serde_json::from_str(r#"{"action": "cancel"}"#).unwrap();
        assert_eq!(cancel, EditResult::Cancel);
    }
}
