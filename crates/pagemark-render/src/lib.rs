//! Pagemark render library
//!
//! The layered rendering pipeline: a base layer of page pixels produced by
//! a host rasterizer, an edit layer of text hit-targets, an ink layer and a
//! selection overlay. Layers are display lists in device space; the host
//! turns them into pixels with whatever graphics backend it uses.

mod backoff;
mod error;
mod layers;
mod paint;
mod pipeline;
mod raster;

pub use backoff::{DeferredDraw, DeferredQueue};
pub use error::{RenderError, RenderResult};
pub use layers::{DrawOp, Layer, LayerKind, LayerStack, MAX_SURFACE_EDGE};
pub use paint::ink_ops;
pub use pipeline::{RenderPipeline, RenderState, SELECTION_COLOR};
pub use raster::{CancelToken, PageRasterizer, RenderJob, RenderOutcome, RenderRequest, device_pixels};
