//! The layer stack: base page pixels, edit hit-targets, ink and overlay.
//!
//! Layers hold display lists in device space. All four share one size and
//! are resized together; until the first resize every draw fails with
//! [`RenderError::SurfaceNotReady`].

use crate::backoff::DeferredQueue;
use crate::error::{RenderError, RenderResult};
use image::RgbaImage;
use kurbo::{BezPath, Point, Rect};
use pagemark_core::element::SerializableColor;
use pagemark_core::{Brush, EditResult, ElementId, InkSink, RetryPolicy};
use peniko::{BlendMode, Compose, Mix};
use std::time::Instant;

/// Largest accepted surface edge, in device pixels.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

/// Layers from back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    /// Decoded page pixels from the rasterizer.
    Base,
    /// Invisible hit-targets used for click dispatch.
    Edit,
    /// Freehand strokes and annotation shapes.
    Ink,
    /// Selection highlighting and remote presence.
    Overlay,
}

impl LayerKind {
    /// Back-to-front order.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Base,
        LayerKind::Edit,
        LayerKind::Ink,
        LayerKind::Overlay,
    ];

    fn index(self) -> usize {
        match self {
            LayerKind::Base => 0,
            LayerKind::Edit => 1,
            LayerKind::Ink => 2,
            LayerKind::Overlay => 3,
        }
    }
}

/// One recorded drawing command, in device pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// A single incremental freehand segment.
    StrokeSegment { from: Point, to: Point, brush: Brush },
    StrokePath { path: BezPath, brush: Brush },
    StrokeRect {
        rect: Rect,
        color: SerializableColor,
        width: f64,
    },
    FillRect {
        rect: Rect,
        color: SerializableColor,
    },
    /// Interior of a closed outline.
    FillPath {
        path: BezPath,
        color: SerializableColor,
    },
    /// Not painted; consulted by hit testing.
    HitRegion { element_id: ElementId, rect: Rect },
}

impl DrawOp {
    /// Compositing mode the backend should paint this command with.
    pub fn blend_mode(&self) -> BlendMode {
        match self {
            DrawOp::StrokeSegment { brush, .. } | DrawOp::StrokePath { brush, .. } => {
                brush.blend_mode()
            }
            _ => BlendMode::new(Mix::Normal, Compose::SrcOver),
        }
    }

    /// Whether the command is painted (hit regions are not).
    pub fn is_visible(&self) -> bool {
        !matches!(self, DrawOp::HitRegion { .. })
    }
}

/// A single drawing surface.
#[derive(Debug, Clone)]
pub struct Layer {
    kind: LayerKind,
    ops: Vec<DrawOp>,
    /// Page pixels, base layer only.
    pixels: Option<RgbaImage>,
}

impl Layer {
    fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            ops: Vec::new(),
            pixels: None,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Recorded commands in paint order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.pixels.is_none()
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.pixels = None;
    }
}

/// The ordered set of layers for the page on screen.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: [Layer; 4],
    /// Shared pixel size; `None` until the first resize.
    size: Option<(u32, u32)>,
    deferred: DeferredQueue,
}

impl LayerStack {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            layers: LayerKind::ALL.map(Layer::new),
            size: None,
            deferred: DeferredQueue::new(retry),
        }
    }

    /// Whether layers have been sized and accept draws.
    pub fn is_ready(&self) -> bool {
        self.size.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.index()]
    }

    /// Layers back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Resize every layer and clear its contents.
    ///
    /// The new set of layers is built first and swapped in as a whole, so
    /// an invalid size leaves the previous surfaces untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
            return Err(RenderError::InvalidSize { width, height });
        }
        self.layers = LayerKind::ALL.map(Layer::new);
        self.size = Some((width, height));
        log::debug!("layers resized to {width}x{height}");
        Ok(())
    }

    fn ready_size(&self, kind: LayerKind) -> RenderResult<(u32, u32)> {
        self.size
            .ok_or_else(|| RenderError::SurfaceNotReady(format!("{kind:?} layer has no size")))
    }

    /// Record a draw on a layer.
    pub fn draw(&mut self, kind: LayerKind, op: DrawOp) -> RenderResult<()> {
        self.ready_size(kind)?;
        self.layers[kind.index()].ops.push(op);
        Ok(())
    }

    /// Draw now, or park the draw for a retry when the surface is not ready.
    ///
    /// Returns true when the draw landed immediately.
    pub fn draw_or_defer(&mut self, kind: LayerKind, op: DrawOp, now: Instant) -> bool {
        if self.is_ready() {
            self.layers[kind.index()].ops.push(op);
            return true;
        }
        log::debug!("{kind:?} layer not ready, deferring draw");
        self.deferred.push(kind, op, now);
        false
    }

    /// Retry parked draws whose delay has elapsed. Returns how many landed.
    pub fn poll_deferred(&mut self, now: Instant) -> usize {
        let mut landed = 0;
        for draw in self.deferred.take_due(now) {
            if self.is_ready() {
                self.layers[draw.layer.index()].ops.push(draw.op);
                landed += 1;
            } else {
                self.deferred.retry(draw, now);
            }
        }
        landed
    }

    /// Draws still waiting for a surface.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Clear a layer and forget its parked draws, then draw `ops` or park
    /// them until the stack is sized.
    pub fn replace_or_defer(&mut self, kind: LayerKind, ops: Vec<DrawOp>, now: Instant) {
        self.layers[kind.index()].clear();
        let dropped = self.deferred.discard(kind);
        if dropped > 0 {
            log::debug!("{kind:?} layer repainted, {dropped} parked draws dropped");
        }
        for op in ops {
            self.draw_or_defer(kind, op, now);
        }
    }

    /// Install decoded page pixels on the base layer.
    pub fn set_base(&mut self, pixels: RgbaImage) -> RenderResult<()> {
        let size = self.ready_size(LayerKind::Base)?;
        if pixels.dimensions() != size {
            let (width, height) = pixels.dimensions();
            return Err(RenderError::InvalidSize { width, height });
        }
        self.layers[LayerKind::Base.index()].pixels = Some(pixels);
        Ok(())
    }

    /// Clear one layer's contents, keeping its size.
    pub fn clear(&mut self, kind: LayerKind) {
        self.layers[kind.index()].clear();
    }

    /// Drop all surfaces; the stack is not ready again until resized.
    pub fn teardown(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
        self.size = None;
        self.deferred.clear();
    }
}

impl InkSink for LayerStack {
    /// Segments drawn before the first resize are parked and land on a
    /// later [`LayerStack::poll_deferred`].
    fn stroke_segment(&mut self, from: Point, to: Point, brush: &Brush) -> EditResult<()> {
        self.draw_or_defer(
            LayerKind::Ink,
            DrawOp::StrokeSegment {
                from,
                to,
                brush: *brush,
            },
            Instant::now(),
        );
        Ok(())
    }
}
