//! Error types for the editing engine.

use crate::element::{ElementId, ElementKind};
use thiserror::Error;

/// Errors raised by element store, editing and snapshot operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// An element references a page outside the loaded document.
    #[error("page index {index} is out of range (document has {page_count} pages)")]
    InvalidPageIndex { index: usize, page_count: usize },
    /// A drawing surface was used before it was initialized.
    #[error("surface not ready: {0}")]
    SurfaceNotReady(String),
    /// The element does not exist or is not a text element.
    #[error("element {0} is not an editable text element")]
    NotEditable(ElementId),
    /// An update tried to replace a payload with one of a different kind.
    #[error("element {id} is a {expected:?}, patch carries a {found:?}")]
    KindMismatch {
        id: ElementId,
        expected: ElementKind,
        found: ElementKind,
    },
    /// The text element was not projected from a page fragment.
    #[error("element {0} has no original text to reset to")]
    NoOriginalText(ElementId),
    /// A serialized session snapshot could not be read or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),
    /// Painting a page or its layers failed.
    #[error("render failed: {0}")]
    Render(String),
}

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        EditError::Snapshot(err.to_string())
    }
}
