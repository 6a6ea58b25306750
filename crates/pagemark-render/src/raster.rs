//! The page rasterizer contract and cancellable render jobs.

use crate::error::RenderResult;
use image::RgbaImage;
use pagemark_core::{BoxFuture, Viewport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag for one render request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a rasterizer is asked to draw.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub page_index: usize,
    pub viewport: Viewport,
    /// Checked by the rasterizer; a cancelled request should stop early and
    /// return [`RenderError::Cancelled`](crate::RenderError::Cancelled).
    pub cancel: CancelToken,
}

impl RenderRequest {
    /// Pixel size the rasterizer must produce.
    pub fn pixel_size(&self) -> (u32, u32) {
        device_pixels(&self.viewport)
    }
}

/// Rounded-up pixel dimensions of a viewport.
pub fn device_pixels(viewport: &Viewport) -> (u32, u32) {
    let size = viewport.device_size();
    (size.width.ceil() as u32, size.height.ceil() as u32)
}

/// Host-supplied page rasterizer.
///
/// Implementations decode the document page at the requested zoom and
/// return RGBA pixels of exactly [`RenderRequest::pixel_size`].
pub trait PageRasterizer {
    fn render(&self, request: RenderRequest) -> BoxFuture<'_, RenderResult<RgbaImage>>;
}

/// An in-flight render handed out by the pipeline.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub(crate) generation: u64,
    pub(crate) request: RenderRequest,
}

impl RenderJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_index(&self) -> usize {
        self.request.page_index
    }

    pub fn viewport(&self) -> Viewport {
        self.request.viewport
    }

    pub fn is_cancelled(&self) -> bool {
        self.request.cancel.is_cancelled()
    }

    /// The request to pass to a [`PageRasterizer`].
    pub fn request(&self) -> RenderRequest {
        self.request.clone()
    }
}

/// How a render job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Pixels were painted to the base layer.
    Completed { page_index: usize, generation: u64 },
    /// Superseded or cancelled; nothing was painted.
    Cancelled { page_index: usize },
    Failed {
        page_index: usize,
        error: crate::RenderError,
    },
}

impl RenderOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RenderOutcome::Completed { .. })
    }
}
