//! The editing session: the single writer over the element store.
//!
//! Local input and remote messages both funnel through `&mut self`, so a
//! remote operation is never applied in the middle of a local one. Remote
//! JSON may be pushed from any thread through [`EditingSession::remote_sender`];
//! it is applied when the host calls [`EditingSession::pump_remote`].

use crate::capture::InkSink;
use crate::clock::PeerId;
use crate::collaboration::{CollabEvent, CollaborationManager, CursorPosition, UserInfo};
use crate::config::{SessionConfig, SessionContext};
use crate::element::{EditableElement, ElementId, ElementPatch};
use crate::error::EditResult;
use crate::export::ExportBundle;
use crate::reconcile::{self, ReconcileReport, TextExtractor, TextFragment, TextProjection};
use crate::snapshot::SessionSnapshot;
use crate::store::ElementStore;
use crate::tools::{ToolKind, ToolManager};
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};
use std::sync::mpsc;

/// One open document being edited by one local user.
pub struct EditingSession {
    ctx: SessionContext,
    store: ElementStore,
    tools: ToolManager,
    collab: CollaborationManager,
    inbox_tx: mpsc::Sender<String>,
    inbox_rx: mpsc::Receiver<String>,
    /// Set on every change that should be persisted.
    dirty: bool,
    closed: bool,
}

impl EditingSession {
    /// Open a session over a document with `page_count` pages.
    pub fn open(config: SessionConfig, local_peer: PeerId, page_count: usize) -> Self {
        let ctx = SessionContext::new(config, local_peer.clone(), page_count);
        let (inbox_tx, inbox_rx) = mpsc::channel();
        log::info!("editing session opened for {local_peer} ({page_count} pages)");
        Self {
            store: ElementStore::new(ctx.clone()),
            tools: ToolManager::new(),
            collab: CollaborationManager::new(local_peer),
            ctx,
            inbox_tx,
            inbox_rx,
            dirty: false,
            closed: false,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &SessionConfig {
        self.ctx.config()
    }

    /// Read access to the element list, selection and history.
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn collaboration(&self) -> &CollaborationManager {
        &self.collab
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns and clears the unsaved-changes flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Broadcast whatever the store queued during the last operation.
    fn flush(&mut self) {
        let ops = self.store.take_outbox();
        if ops.is_empty() {
            return;
        }
        self.dirty = true;
        self.collab.broadcast_ops(&ops);
    }

    // --- Element operations ---

    pub fn add(&mut self, element: EditableElement) -> EditResult<ElementId> {
        let result = self.store.add(element);
        self.flush();
        result
    }

    pub fn update(&mut self, id: ElementId, patch: ElementPatch) -> EditResult<bool> {
        let result = self.store.update(id, patch);
        self.flush();
        result
    }

    pub fn move_element(&mut self, id: ElementId, delta: Vec2) -> EditResult<bool> {
        let result = self.store.move_element(id, delta);
        self.flush();
        result
    }

    pub fn remove(&mut self, id: ElementId) -> Option<EditableElement> {
        let removed = self.store.remove(id);
        self.flush();
        if removed.is_some() {
            self.publish_selection();
        }
        removed
    }

    /// Remove every selected element as one step each.
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<ElementId> = self.store.selection().iter().copied().collect();
        let removed = ids
            .into_iter()
            .filter(|id| self.store.remove(*id).is_some())
            .count();
        self.flush();
        self.publish_selection();
        removed
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        self.flush();
        self.publish_selection();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.store.redo();
        self.flush();
        self.publish_selection();
        redone
    }

    // --- Selection and presence ---

    pub fn select(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.store.select(ids);
        self.publish_selection();
    }

    /// Select the topmost element under a device point, or clear.
    pub fn select_at(&mut self, page_index: usize, point: Point, viewport: &Viewport) -> Option<ElementId> {
        let hit = self
            .store
            .elements_at(page_index, point, viewport, self.ctx.config().hit_tolerance)
            .first()
            .copied();
        self.select(hit);
        hit
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
        self.publish_selection();
    }

    fn publish_selection(&mut self) {
        let ids: Vec<ElementId> = self.store.selection().iter().copied().collect();
        self.collab.set_selection(ids);
    }

    /// Share the local pointer position (device space) with peers.
    pub fn set_cursor(&mut self, page_index: usize, point: Option<Point>, viewport: &Viewport) {
        let cursor = point.map(|p| {
            let page = viewport.to_page(p);
            CursorPosition {
                page_index,
                x: page.x,
                y: page.y,
            }
        });
        self.collab.set_cursor(cursor);
    }

    pub fn set_user_info(&mut self, user: UserInfo) {
        self.collab.set_user_info(user);
    }

    // --- Text editing ---

    pub fn start_edit(&mut self, id: ElementId) -> EditResult<()> {
        self.store.start_edit(id)
    }

    pub fn commit_edit(&mut self, id: ElementId, new_text: impl Into<String>) -> EditResult<()> {
        let result = self.store.commit_edit(id, new_text);
        self.flush();
        result
    }

    pub fn cancel_edit(&mut self, id: ElementId) -> bool {
        self.store.cancel_edit(id)
    }

    pub fn reset_to_original(&mut self, id: ElementId) -> EditResult<()> {
        let result = self.store.reset_to_original(id);
        self.flush();
        result
    }

    /// Project a page's text fragments into editable elements.
    pub fn reconcile(
        &mut self,
        page_index: usize,
        fragments: &[TextFragment],
        viewport: &Viewport,
    ) -> EditResult<ReconcileReport> {
        let report = reconcile::reconcile_page(&mut self.store, page_index, fragments, viewport)?;
        if report.created > 0 || report.repositioned > 0 {
            self.dirty = true;
        }
        Ok(report)
    }

    /// Fetch fragments from `extractor` and reconcile them.
    pub async fn reconcile_from<E: TextExtractor + ?Sized>(
        &mut self,
        extractor: &E,
        page_index: usize,
        viewport: &Viewport,
    ) -> EditResult<ReconcileReport> {
        self.ctx.check_page(page_index)?;
        let fragments = extractor.extract(page_index).await?;
        self.reconcile(page_index, &fragments, viewport)
    }

    /// Device placement of projected text on a page.
    pub fn text_projections(&self, page_index: usize, viewport: &Viewport) -> Vec<TextProjection> {
        reconcile::text_projections(&self.store, page_index, viewport)
    }

    // --- Tools ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool);
    }

    pub fn pointer_down(&mut self, page_index: usize, point: Point, viewport: Viewport) {
        self.tools
            .begin(page_index, point, viewport, self.ctx.config());
    }

    pub fn pointer_move(&mut self, point: Point, sink: &mut dyn InkSink) {
        self.tools.update(point, sink);
    }

    pub fn pointer_up(&mut self, point: Point) -> EditResult<Option<ElementId>> {
        let result = self.tools.end(point, &mut self.store, self.ctx.config());
        self.flush();
        result
    }

    // --- Collaboration ---

    /// Start collaborating.
    pub fn join_collaboration(&mut self) {
        if !self.closed {
            self.collab.join();
        }
    }

    /// Stop collaborating; peers are told we left.
    pub fn leave_collaboration(&mut self) {
        self.collab.leave();
    }

    /// Sender the transport uses to deliver incoming JSON.
    pub fn remote_sender(&self) -> mpsc::Sender<String> {
        self.inbox_tx.clone()
    }

    /// Take pending outgoing JSON messages.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.collab.take_outgoing()
    }

    /// Apply every message waiting in the inbox, in arrival order.
    pub fn pump_remote(&mut self) -> Vec<CollabEvent> {
        let mut events = Vec::new();
        while let Ok(json) = self.inbox_rx.try_recv() {
            if let Some(event) = self.receive(&json) {
                events.push(event);
            }
        }
        events
    }

    /// Apply one incoming message.
    pub fn receive(&mut self, json: &str) -> Option<CollabEvent> {
        if self.closed {
            log::debug!("session closed, incoming message dropped");
            return None;
        }
        let event = self.collab.handle_message(json)?;
        if let CollabEvent::Operation(op) = &event {
            match self.store.apply_remote(op) {
                Ok(true) => self.dirty = true,
                Ok(false) => {}
                Err(err) => {
                    log::warn!("remote operation from {} dropped: {err}", op.author_id);
                    return None;
                }
            }
            self.publish_selection();
        }
        Some(event)
    }

    // --- Export and persistence ---

    pub fn export(&self) -> ExportBundle {
        ExportBundle::from_store(&self.store)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(
            self.ctx.page_count(),
            self.store.all().to_vec(),
            self.store.clock_time(),
        )
    }

    /// Serialize the current state as JSON.
    pub fn serialize_state(&self) -> EditResult<String> {
        self.snapshot().to_json()
    }

    /// Replace the current state with a serialized snapshot.
    ///
    /// Every element must reference an existing page. History restarts at
    /// the restored state.
    pub fn restore_state(&mut self, json: &str) -> EditResult<()> {
        let snapshot = SessionSnapshot::from_json(json)?;
        self.restore_snapshot(snapshot)
    }

    pub fn restore_snapshot(&mut self, snapshot: SessionSnapshot) -> EditResult<()> {
        if snapshot.page_count != self.ctx.page_count() {
            log::warn!(
                "snapshot was taken with {} pages, document has {}",
                snapshot.page_count,
                self.ctx.page_count()
            );
        }
        self.tools.cancel();
        self.store.replace_all(snapshot.elements, snapshot.clock)?;
        self.publish_selection();
        log::info!("restored {} element(s) from snapshot", self.store.len());
        Ok(())
    }

    /// Close the session: queued remote messages are dropped and
    /// collaboration stops without sending anything further.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let dropped = self.inbox_rx.try_iter().count();
        if dropped > 0 {
            log::debug!("dropped {dropped} queued remote message(s) on close");
        }
        self.tools.cancel();
        if let Some(id) = self.store.editing() {
            self.store.cancel_edit(id);
        }
        self.collab.shutdown();
        log::info!("editing session closed");
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        self.close();
    }
}
