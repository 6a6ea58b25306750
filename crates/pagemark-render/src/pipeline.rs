//! The layered rendering pipeline for the page on screen.
//!
//! Base-layer renders are cancellable jobs. Starting a render cancels the
//! one in flight and bumps a generation counter; a job only paints if its
//! generation is still current when it finishes, so a superseded render can
//! never overwrite a newer one.
//!
//! ```text
//! Idle -> Rendering -> Ready | Cancelled | Failed
//! ```

use crate::error::{RenderError, RenderResult};
use crate::layers::{DrawOp, LayerKind, LayerStack};
use crate::paint;
use crate::raster::{self, CancelToken, PageRasterizer, RenderJob, RenderOutcome, RenderRequest};
use image::RgbaImage;
use kurbo::Point;
use pagemark_core::collaboration::PresenceMap;
use pagemark_core::element::SerializableColor;
use pagemark_core::{EditableElement, ElementId, ElementStore, SessionContext, TextProjection, Viewport};
use std::time::Instant;

/// Local selection outline color.
pub const SELECTION_COLOR: SerializableColor = SerializableColor::new(59, 130, 246, 255);

/// Selection outline width in device pixels.
const SELECTION_STROKE: f64 = 2.0;

/// Side of the square drawn at a remote cursor, in device pixels.
const CURSOR_SIZE: f64 = 6.0;

/// Base-layer render state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Rendering { page_index: usize, generation: u64 },
    Ready { page_index: usize, generation: u64 },
    Cancelled { page_index: usize },
    Failed { page_index: usize, error: RenderError },
}

/// Layers plus the render state machine for one page view.
#[derive(Debug)]
pub struct RenderPipeline {
    ctx: SessionContext,
    layers: LayerStack,
    state: RenderState,
    generation: u64,
    in_flight: Option<CancelToken>,
    ready_viewport: Option<Viewport>,
}

impl RenderPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        let layers = LayerStack::new(ctx.config().surface_retry);
        Self {
            ctx,
            layers,
            state: RenderState::Idle,
            generation: 0,
            in_flight: None,
            ready_viewport: None,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Mutable layers, e.g. as the [`InkSink`](pagemark_core::InkSink) for capture.
    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    /// Generation of the most recently started render.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Viewport whose device coordinates are valid, once a render completed.
    ///
    /// This is the ready signal consumed by text reconciliation: `None`
    /// while a render is in flight or after it was cancelled or failed.
    pub fn ready_viewport(&self) -> Option<Viewport> {
        self.ready_viewport
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RenderState::Ready { .. })
    }

    /// Start rendering a page, cancelling any render in flight.
    ///
    /// All layers are resized to the viewport's pixel size and cleared.
    pub fn begin_render(&mut self, page_index: usize, viewport: Viewport) -> RenderResult<RenderJob> {
        self.ctx.check_page(page_index)?;
        let (width, height) = raster::device_pixels(&viewport);
        if !viewport.is_valid() {
            return Err(RenderError::InvalidSize { width, height });
        }
        self.cancel_in_flight();
        self.layers.resize(width, height)?;

        self.generation += 1;
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        self.ready_viewport = None;
        self.state = RenderState::Rendering {
            page_index,
            generation: self.generation,
        };
        log::debug!("render {} of page {page_index} started at {width}x{height}", self.generation);

        Ok(RenderJob {
            generation: self.generation,
            request: RenderRequest {
                page_index,
                viewport,
                cancel,
            },
        })
    }

    /// Record the rasterizer's result for a job.
    ///
    /// Pixels are painted only if the job is still the current generation
    /// and was not cancelled; otherwise the result is discarded.
    pub fn finish_render(&mut self, job: RenderJob, result: RenderResult<RgbaImage>) -> RenderOutcome {
        let page_index = job.page_index();
        if job.generation != self.generation || job.is_cancelled() {
            log::debug!("render {} of page {page_index} superseded", job.generation);
            return RenderOutcome::Cancelled { page_index };
        }
        self.in_flight = None;

        let painted = result.and_then(|pixels| self.layers.set_base(pixels));
        match painted {
            Ok(()) => {
                self.state = RenderState::Ready {
                    page_index,
                    generation: job.generation,
                };
                self.ready_viewport = Some(job.viewport());
                RenderOutcome::Completed {
                    page_index,
                    generation: job.generation,
                }
            }
            Err(RenderError::Cancelled) => {
                log::debug!("render of page {page_index} cancelled by rasterizer");
                self.state = RenderState::Cancelled { page_index };
                RenderOutcome::Cancelled { page_index }
            }
            Err(error) => {
                log::warn!("render of page {page_index} failed: {error}");
                self.state = RenderState::Failed {
                    page_index,
                    error: error.clone(),
                };
                RenderOutcome::Failed { page_index, error }
            }
        }
    }

    /// Render a page start to finish with `rasterizer`.
    pub async fn render_page<R: PageRasterizer + ?Sized>(
        &mut self,
        rasterizer: &R,
        page_index: usize,
        viewport: Viewport,
    ) -> RenderResult<RenderOutcome> {
        let job = self.begin_render(page_index, viewport)?;
        let result = rasterizer.render(job.request()).await;
        Ok(self.finish_render(job, result))
    }

    /// Cancel the render in flight, if any. Used on page navigation.
    pub fn cancel_in_flight(&mut self) {
        let Some(token) = self.in_flight.take() else {
            return;
        };
        token.cancel();
        if let RenderState::Rendering { page_index, generation } = self.state {
            log::debug!("render {generation} of page {page_index} cancelled");
            self.state = RenderState::Cancelled { page_index };
        }
    }

    /// Cancel rendering and release every surface. Used on session close.
    pub fn teardown(&mut self) {
        self.cancel_in_flight();
        self.layers.teardown();
        self.ready_viewport = None;
        self.state = RenderState::Idle;
    }

    /// Repaint committed annotations of one page onto the ink layer.
    ///
    /// Before the first render the commands are parked and land on a later
    /// [`RenderPipeline::poll_deferred`]. Returns the number of elements painted.
    pub fn paint_ink<'a>(
        &mut self,
        elements: impl IntoIterator<Item = &'a EditableElement>,
        viewport: &Viewport,
    ) -> usize {
        let mut ops = Vec::new();
        let mut painted = 0;
        for element in elements {
            let element_ops = paint::ink_ops(element, viewport);
            if element_ops.is_empty() {
                continue;
            }
            ops.extend(element_ops);
            painted += 1;
        }
        self.layers.replace_or_defer(LayerKind::Ink, ops, Instant::now());
        painted
    }

    /// Redraw selection outlines: the local selection plus each remote
    /// peer's selection and cursor in that peer's color.
    pub fn paint_overlay(
        &mut self,
        store: &ElementStore,
        page_index: usize,
        collaborators: &PresenceMap,
        viewport: &Viewport,
    ) {
        let outline = |id: &ElementId| {
            store
                .get(*id)
                .filter(|element| element.page_index() == page_index)
                .map(|element| element.device_bounds(viewport))
        };

        let mut local: Vec<ElementId> = store.selection().iter().copied().collect();
        local.sort();
        let mut ops: Vec<DrawOp> = local
            .iter()
            .filter_map(outline)
            .map(|rect| DrawOp::StrokeRect {
                rect,
                color: SELECTION_COLOR,
                width: SELECTION_STROKE,
            })
            .collect();

        for peer in collaborators.iter() {
            ops.extend(
                peer.selected_element_ids
                    .iter()
                    .filter_map(outline)
                    .map(|rect| DrawOp::StrokeRect {
                        rect,
                        color: peer.color,
                        width: SELECTION_STROKE,
                    }),
            );
            if let Some(cursor) = peer.cursor.filter(|c| c.page_index == page_index) {
                let at = viewport.to_device(Point::new(cursor.x, cursor.y));
                ops.push(DrawOp::FillRect {
                    rect: kurbo::Rect::from_center_size(at, (CURSOR_SIZE, CURSOR_SIZE)),
                    color: peer.color,
                });
            }
        }
        self.layers.replace_or_defer(LayerKind::Overlay, ops, Instant::now());
    }

    /// Replace the edit layer's hit-targets with the given projections.
    pub fn rebuild_edit_targets(&mut self, projections: &[TextProjection]) {
        let ops = projections
            .iter()
            .map(|projection| DrawOp::HitRegion {
                element_id: projection.element_id,
                rect: projection.device_bounds,
            })
            .collect();
        self.layers.replace_or_defer(LayerKind::Edit, ops, Instant::now());
    }

    /// Retry draws parked before the layers were sized. The host calls this
    /// from its frame loop; returns how many landed.
    pub fn poll_deferred(&mut self, now: Instant) -> usize {
        self.layers.poll_deferred(now)
    }

    /// The editable text element under a device point, topmost first.
    pub fn hit_test_edit(&self, point: Point) -> Option<ElementId> {
        self.layers
            .layer(LayerKind::Edit)
            .ops()
            .iter()
            .rev()
            .find_map(|op| match op {
                DrawOp::HitRegion { element_id, rect } if rect.contains(point) => Some(*element_id),
                _ => None,
            })
    }
}
