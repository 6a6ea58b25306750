//! Pagemark core: annotation and direct text editing for paged documents.
//!
//! This crate owns the element model, the element store with its undo
//! history, freehand capture, reconciliation of a page's existing text into
//! editable elements, and the last-writer-wins collaboration layer. Page
//! rasterization, text extraction, transport and the final document writer
//! are supplied by the host.

pub mod capture;
pub mod clock;
pub mod collaboration;
pub mod config;
pub mod element;
pub mod error;
pub mod export;
pub mod history;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod tools;
pub mod viewport;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by host-supplied async collaborators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub use capture::{Brush, FreehandCapture, InkSink};
pub use clock::{LamportClock, PeerId, Stamp};
pub use collaboration::{CollabEvent, CollabMessage, CollaborationManager, Collaborator};
pub use config::{RetryPolicy, SessionConfig, SessionContext};
pub use element::{EditableElement, ElementId, ElementKind, ElementPatch, ElementPayload};
pub use error::{EditError, EditResult};
pub use export::{ExportBundle, TextReplacement};
pub use history::{HistoryFrame, HistoryStack};
pub use reconcile::{ReconcileReport, SkipReason, TextExtractor, TextFragment, TextProjection};
pub use session::EditingSession;
pub use snapshot::SessionSnapshot;
pub use store::{ElementOp, ElementStore, StampedOp};
pub use tools::{ToolKind, ToolManager};
pub use viewport::Viewport;

// Re-export kurbo and peniko for convenience
pub use kurbo;
pub use peniko;
