//! Rendering errors.

use pagemark_core::EditError;
use thiserror::Error;

/// Errors raised by the rendering pipeline and page rasterizers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// A render was superseded or explicitly cancelled. Expected, not a failure.
    #[error("render cancelled")]
    Cancelled,
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    #[error("surface not ready: {0}")]
    SurfaceNotReady(String),
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl RenderError {
    /// Whether this error is an expected cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

impl From<RenderError> for EditError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::SurfaceNotReady(msg) => EditError::SurfaceNotReady(msg),
            RenderError::Edit(inner) => inner,
            other => EditError::Render(other.to_string()),
        }
    }
}
