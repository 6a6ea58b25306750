//! The authoritative element list.
//!
//! Every local mutation goes through [`ElementStore`]: it validates page
//! indices, stamps the write on the session's Lamport clock, commits a
//! history frame and queues a replicated operation. Remote operations and
//! text projections are "untracked": they are merged into the current list
//! and into every history frame, but never create an undo step.

use crate::clock::{LamportClock, PeerId, Stamp};
use crate::config::SessionContext;
use crate::element::{
    EditableElement, ElementId, ElementKind, ElementPatch, ElementPayload, TextPayload, TextSource,
};
use crate::error::{EditError, EditResult};
use crate::history::{HistoryFrame, HistoryStack};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One replicated element mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ElementOp {
    Add {
        element: EditableElement,
    },
    Update {
        id: ElementId,
        page_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bounds: Option<Rect>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<ElementPayload>,
    },
    Remove {
        id: ElementId,
        page_index: usize,
    },
}

impl ElementOp {
    pub fn element_id(&self) -> ElementId {
        match self {
            ElementOp::Add { element } => element.id(),
            ElementOp::Update { id, .. } | ElementOp::Remove { id, .. } => *id,
        }
    }

    pub fn page_index(&self) -> usize {
        match self {
            ElementOp::Add { element } => element.page_index(),
            ElementOp::Update { page_index, .. } | ElementOp::Remove { page_index, .. } => {
                *page_index
            }
        }
    }

    fn update_from(element: &EditableElement) -> Self {
        ElementOp::Update {
            id: element.id(),
            page_index: element.page_index(),
            bounds: Some(element.bounds),
            payload: Some(element.payload.clone()),
        }
    }
}

/// An operation wrapped with its author and logical timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedOp {
    pub author_id: PeerId,
    pub timestamp: u64,
    pub op: ElementOp,
}

impl StampedOp {
    pub fn new(stamp: Stamp, op: ElementOp) -> Self {
        Self {
            author_id: stamp.author,
            timestamp: stamp.clock,
            op,
        }
    }

    pub fn stamp(&self) -> Stamp {
        Stamp::new(self.timestamp, self.author_id.clone())
    }
}

/// Owns the element list, selection, text-edit flag and undo history.
#[derive(Debug)]
pub struct ElementStore {
    ctx: SessionContext,
    /// Elements in insertion order.
    elements: Vec<EditableElement>,
    selection: HashSet<ElementId>,
    /// The single text element currently being edited.
    editing: Option<ElementId>,
    /// Last accepted write per element.
    versions: HashMap<ElementId, Stamp>,
    /// Removal stamps, so an older `add` cannot resurrect a deleted element.
    tombstones: HashMap<ElementId, Stamp>,
    clock: LamportClock,
    history: HistoryStack,
    /// Local operations waiting to be broadcast.
    outbox: Vec<StampedOp>,
    /// Elements with uncommitted transient updates.
    transient: Vec<ElementId>,
}

impl ElementStore {
    /// Create an empty store; the empty list is the first history frame.
    pub fn new(ctx: SessionContext) -> Self {
        let mut history = HistoryStack::with_limit(ctx.config().history_limit);
        history.commit(HistoryFrame::default());
        Self {
            ctx,
            elements: Vec::new(),
            selection: HashSet::new(),
            editing: None,
            versions: HashMap::new(),
            tombstones: HashMap::new(),
            clock: LamportClock::new(),
            history,
            outbox: Vec::new(),
            transient: Vec::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Current logical time.
    pub fn clock_time(&self) -> u64 {
        self.clock.now()
    }

    fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    fn next_stamp(&mut self) -> Stamp {
        Stamp::new(self.clock.tick(), self.ctx.local_peer().clone())
    }

    fn record_local(&mut self, stamp: Stamp, op: ElementOp) {
        let id = op.element_id();
        if matches!(op, ElementOp::Remove { .. }) {
            self.tombstones.insert(id, stamp.clone());
        } else {
            self.tombstones.remove(&id);
        }
        self.versions.insert(id, stamp.clone());
        self.outbox.push(StampedOp::new(stamp, op));
    }

    fn commit_frame(&mut self) {
        self.history.commit(HistoryFrame::new(self.elements.clone()));
    }

    // --- Queries ---

    pub fn get(&self, id: ElementId) -> Option<&EditableElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// All elements in insertion order.
    pub fn all(&self) -> &[EditableElement] {
        &self.elements
    }

    /// Elements on one page in insertion order.
    pub fn by_page(&self, page_index: usize) -> impl Iterator<Item = &EditableElement> {
        self.elements
            .iter()
            .filter(move |e| e.page_index() == page_index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements under a device point, topmost first.
    pub fn elements_at(
        &self,
        page_index: usize,
        device_point: Point,
        viewport: &Viewport,
        tolerance: f64,
    ) -> Vec<ElementId> {
        let point = viewport.to_page(device_point);
        let tolerance = viewport.length_to_page(tolerance);
        let mut hits: Vec<ElementId> = self
            .by_page(page_index)
            .filter(|e| e.hit_test(point, tolerance))
            .map(|e| e.id())
            .collect();
        hits.reverse();
        hits
    }

    /// Reconciled text elements whose text differs from the page.
    pub fn modified_text(&self) -> impl Iterator<Item = &EditableElement> {
        self.elements
            .iter()
            .filter(|e| e.as_text().is_some_and(TextPayload::is_modified))
    }

    // --- Local mutations ---

    /// Append an element and commit a history frame.
    pub fn add(&mut self, mut element: EditableElement) -> EditResult<ElementId> {
        self.ctx.check_page(element.page_index())?;
        let id = element.id();
        let stamp = self.next_stamp();
        element.created_at = stamp.clock;
        element.updated_at = stamp.clock;

        match self.index_of(id) {
            Some(idx) => {
                log::warn!("element {id} added twice, replacing");
                self.elements[idx] = element.clone();
            }
            None => self.elements.push(element.clone()),
        }
        self.record_local(stamp, ElementOp::Add { element });
        self.commit_frame();
        log::debug!("added element {id}");
        Ok(id)
    }

    /// Merge a patch into an element and commit a history frame.
    ///
    /// Returns `Ok(false)` when the element does not exist.
    pub fn update(&mut self, id: ElementId, patch: ElementPatch) -> EditResult<bool> {
        if !self.patch_in_place(id, &patch)? {
            log::debug!("update for unknown element {id} ignored");
            return Ok(false);
        }
        self.transient.retain(|t| *t != id);
        if let Some(element) = self.get(id) {
            let op = ElementOp::update_from(element);
            let stamp = Stamp::new(element.updated_at, self.ctx.local_peer().clone());
            self.record_local(stamp, op);
        }
        self.commit_frame();
        Ok(true)
    }

    /// Merge a patch without creating an undo step or broadcasting.
    ///
    /// Used while a gesture or edit is in progress; call
    /// [`commit_transient`](Self::commit_transient) when it ends.
    pub fn update_transient(&mut self, id: ElementId, patch: ElementPatch) -> EditResult<bool> {
        if !self.patch_in_place(id, &patch)? {
            return Ok(false);
        }
        if !self.transient.contains(&id) {
            self.transient.push(id);
        }
        Ok(true)
    }

    /// Commit pending transient updates as one history frame.
    pub fn commit_transient(&mut self) -> bool {
        let pending = std::mem::take(&mut self.transient);
        let ops: Vec<ElementOp> = pending
            .iter()
            .filter_map(|id| self.get(*id))
            .map(ElementOp::update_from)
            .collect();
        if ops.is_empty() {
            return false;
        }
        for op in ops {
            let stamp = self.next_stamp();
            self.record_local(stamp, op);
        }
        self.commit_frame();
        true
    }

    fn patch_in_place(&mut self, id: ElementId, patch: &ElementPatch) -> EditResult<bool> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        self.elements[idx].apply_patch(patch)?;
        let time = self.clock.tick();
        self.elements[idx].updated_at = time;
        Ok(true)
    }

    /// Move an element by a page-space offset.
    pub fn move_element(&mut self, id: ElementId, delta: Vec2) -> EditResult<bool> {
        let Some(patch) = self.get(id).map(|e| e.translation(delta)) else {
            return Ok(false);
        };
        self.update(id, patch)
    }

    /// Delete an element. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: ElementId) -> Option<EditableElement> {
        let idx = self.index_of(id)?;
        let removed = self.elements.remove(idx);
        let stamp = self.next_stamp();
        self.record_local(
            stamp,
            ElementOp::Remove {
                id,
                page_index: removed.page_index(),
            },
        );
        self.prune_ui_state();
        self.commit_frame();
        log::debug!("removed element {id}");
        Some(removed)
    }

    // --- Selection ---

    /// Replace the selection. Unknown ids are ignored.
    pub fn select(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.selection = ids
            .into_iter()
            .filter(|id| self.index_of(*id).is_some())
            .collect();
    }

    pub fn selection(&self) -> &HashSet<ElementId> {
        &self.selection
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- Text editing ---

    fn text_payload(&self, id: ElementId) -> EditResult<&TextPayload> {
        self.get(id)
            .and_then(EditableElement::as_text)
            .ok_or(EditError::NotEditable(id))
    }

    /// Begin editing a text element, ending any other edit.
    pub fn start_edit(&mut self, id: ElementId) -> EditResult<()> {
        self.text_payload(id)?;
        if let Some(previous) = self.editing.replace(id) {
            if previous != id {
                log::debug!("edit of {previous} ended by edit of {id}");
            }
        }
        Ok(())
    }

    pub fn editing(&self) -> Option<ElementId> {
        self.editing
    }

    pub fn is_editing(&self, id: ElementId) -> bool {
        self.editing == Some(id)
    }

    /// Replace the text of an element and end its edit.
    pub fn commit_edit(&mut self, id: ElementId, new_text: impl Into<String>) -> EditResult<()> {
        let mut payload = self.text_payload(id)?.clone();
        payload.text = new_text.into();
        self.update(id, ElementPatch::payload(ElementPayload::Text(payload)))?;
        self.end_edit(id);
        Ok(())
    }

    /// End an edit without touching the text.
    pub fn cancel_edit(&mut self, id: ElementId) -> bool {
        self.end_edit(id)
    }

    /// Restore a reconciled element's text to what the page contains.
    pub fn reset_to_original(&mut self, id: ElementId) -> EditResult<()> {
        let mut payload = self.text_payload(id)?.clone();
        let original = payload
            .original_text()
            .map(str::to_owned)
            .ok_or(EditError::NoOriginalText(id))?;
        payload.text = original;
        self.update(id, ElementPatch::payload(ElementPayload::Text(payload)))?;
        self.end_edit(id);
        Ok(())
    }

    fn end_edit(&mut self, id: ElementId) -> bool {
        if self.editing == Some(id) {
            self.editing = None;
            true
        } else {
            false
        }
    }

    fn prune_ui_state(&mut self) {
        let live: HashSet<ElementId> = self.elements.iter().map(|e| e.id()).collect();
        self.selection.retain(|id| live.contains(id));
        if self.editing.is_some_and(|id| !live.contains(&id)) {
            self.editing = None;
        }
    }

    // --- History ---

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the previous frame. The difference is queued for broadcast.
    pub fn undo(&mut self) -> bool {
        let Some(frame) = self.history.undo() else {
            return false;
        };
        let target = frame.elements().to_vec();
        self.restore(target);
        true
    }

    /// Restore the next frame. The difference is queued for broadcast.
    pub fn redo(&mut self) -> bool {
        let Some(frame) = self.history.redo() else {
            return false;
        };
        let target = frame.elements().to_vec();
        self.restore(target);
        true
    }

    fn restore(&mut self, target: Vec<EditableElement>) {
        let before = std::mem::replace(&mut self.elements, target);
        self.transient.clear();

        let mut ops = Vec::new();
        for old in &before {
            if self.index_of(old.id()).is_none() {
                ops.push(ElementOp::Remove {
                    id: old.id(),
                    page_index: old.page_index(),
                });
            }
        }
        for new in &self.elements {
            match before.iter().find(|b| b.id() == new.id()) {
                None => ops.push(ElementOp::Add {
                    element: new.clone(),
                }),
                Some(old) if old != new => ops.push(ElementOp::update_from(new)),
                Some(_) => {}
            }
        }
        for op in ops {
            let stamp = self.next_stamp();
            self.record_local(stamp, op);
        }
        self.prune_ui_state();
    }

    /// Local operations queued since the last call.
    pub fn take_outbox(&mut self) -> Vec<StampedOp> {
        std::mem::take(&mut self.outbox)
    }

    // --- Untracked writes ---

    fn is_stale(&self, id: ElementId, stamp: &Stamp) -> bool {
        self.versions.get(&id).is_some_and(|v| v >= stamp)
            || self.tombstones.get(&id).is_some_and(|t| t >= stamp)
    }

    /// Whether the element was deleted and not restored since.
    pub(crate) fn is_tombstoned(&self, id: ElementId) -> bool {
        self.tombstones.contains_key(&id) && self.index_of(id).is_none()
    }

    fn fold_upsert(&mut self, element: EditableElement) {
        self.history
            .fold_into_frames(|elements| upsert(elements, element.clone()));
        upsert(&mut self.elements, element);
    }

    fn fold_patch(&mut self, id: ElementId, patch: &ElementPatch, updated_at: Option<u64>) {
        let apply = |elements: &mut Vec<EditableElement>| {
            if let Some(el) = elements.iter_mut().find(|e| e.id() == id) {
                if el.apply_patch(patch).is_ok() {
                    if let Some(time) = updated_at {
                        el.updated_at = time;
                    }
                }
            }
        };
        self.history.fold_into_frames(&apply);
        apply(&mut self.elements);
    }

    fn fold_remove(&mut self, id: ElementId) {
        self.history
            .fold_into_frames(|elements| elements.retain(|e| e.id() != id));
        self.elements.retain(|e| e.id() != id);
        self.transient.retain(|t| *t != id);
        self.prune_ui_state();
    }

    /// Apply an operation received from a peer.
    ///
    /// Older writes lose to newer ones (ties broken by author). Returns
    /// whether the operation changed the element list; operations on
    /// unknown elements are ignored.
    pub fn apply_remote(&mut self, stamped: &StampedOp) -> EditResult<bool> {
        let stamp = stamped.stamp();
        self.clock.observe(stamp.clock);
        self.ctx.check_page(stamped.op.page_index())?;

        let id = stamped.op.element_id();
        if self.is_stale(id, &stamp) {
            log::debug!("stale operation on {id} from {} ignored", stamp.author);
            return Ok(false);
        }

        match &stamped.op {
            ElementOp::Add { element } => {
                if let Some(existing) = self.get(id) {
                    if existing.page_index() != element.page_index() {
                        log::warn!("remote add moves {id} to another page, ignored");
                        return Ok(false);
                    }
                }
                self.tombstones.remove(&id);
                self.fold_upsert(element.clone());
            }
            ElementOp::Update {
                page_index,
                bounds,
                payload,
                ..
            } => {
                let Some(existing) = self.get(id) else {
                    log::debug!("update for unknown element {id} ignored");
                    return Ok(false);
                };
                if existing.page_index() != *page_index {
                    log::warn!("remote update for {id} names the wrong page, ignored");
                    return Ok(false);
                }
                if let Some(found) = payload.as_ref().map(ElementPayload::kind) {
                    if found != existing.kind() {
                        return Err(EditError::KindMismatch {
                            id,
                            expected: existing.kind(),
                            found,
                        });
                    }
                }
                let patch = ElementPatch {
                    bounds: *bounds,
                    payload: payload.clone(),
                };
                self.fold_patch(id, &patch, Some(stamp.clock));
            }
            ElementOp::Remove { .. } => {
                self.tombstones.insert(id, stamp.clone());
                if self.get(id).is_none() {
                    return Ok(false);
                }
                self.fold_remove(id);
            }
        }
        self.versions.insert(id, stamp);
        Ok(true)
    }

    /// Insert or replace an element without an undo step or broadcast.
    pub(crate) fn put_untracked(&mut self, element: EditableElement) -> EditResult<()> {
        self.ctx.check_page(element.page_index())?;
        self.fold_upsert(element);
        Ok(())
    }

    /// Move a projected text element to refreshed page geometry.
    ///
    /// Only bounds and the fragment source are written; each history frame
    /// keeps its own text, so undoing an edit still restores the old text.
    pub(crate) fn reposition_text(&mut self, id: ElementId, bounds: Rect, source: &TextSource) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let apply = |elements: &mut Vec<EditableElement>| {
            if let Some(el) = elements.iter_mut().find(|e| e.id() == id) {
                el.bounds = bounds;
                if let ElementPayload::Text(text) = &mut el.payload {
                    text.source = Some(source.clone());
                }
            }
        };
        self.history.fold_into_frames(&apply);
        apply(&mut self.elements);
        true
    }

    /// Replace the whole state, e.g. from a saved snapshot.
    ///
    /// History restarts with the restored list as its only frame.
    pub(crate) fn replace_all(
        &mut self,
        elements: Vec<EditableElement>,
        clock_time: u64,
    ) -> EditResult<()> {
        for element in &elements {
            self.ctx.check_page(element.page_index())?;
        }
        self.elements = elements;
        self.selection.clear();
        self.editing = None;
        self.versions.clear();
        self.tombstones.clear();
        self.transient.clear();
        self.outbox.clear();
        self.clock = LamportClock::starting_at(clock_time.max(self.clock.now()));
        self.history.reset(HistoryFrame::new(self.elements.clone()));
        Ok(())
    }

    /// Kind of an element, if present.
    pub fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.get(id).map(EditableElement::kind)
    }
}

fn upsert(elements: &mut Vec<EditableElement>, element: EditableElement) {
    match elements.iter_mut().find(|e| e.id() == element.id()) {
        Some(slot) => *slot = element,
        None => elements.push(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::element::{ShapePayload, TextPayload};
    use uuid::Uuid;

    fn store(pages: usize) -> ElementStore {
        ElementStore::new(SessionContext::new(
            SessionConfig::default(),
            PeerId::from("local"),
            pages,
        ))
    }

    fn rect(page: usize) -> EditableElement {
        EditableElement::new(
            page,
            Rect::new(10.0, 10.0, 50.0, 30.0),
            ElementPayload::Rectangle(ShapePayload::default()),
        )
    }

    fn text(page: usize, s: &str) -> EditableElement {
        EditableElement::new(
            page,
            Rect::new(0.0, 0.0, 100.0, 14.0),
            ElementPayload::Text(TextPayload::new(s, 14.0)),
        )
    }

    #[test]
    fn test_add_rejects_bad_page() {
        let mut store = store(2);
        let err = store.add(rect(2)).unwrap_err();
        assert_eq!(
            err,
            EditError::InvalidPageIndex {
                index: 2,
                page_count: 2
            }
        );
        assert!(store.is_empty());
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_by_page_keeps_insertion_order() {
        let mut store = store(2);
        let a = store.add(rect(0)).unwrap();
        store.add(rect(1)).unwrap();
        let c = store.add(rect(0)).unwrap();
        let ids: Vec<_> = store.by_page(0).map(|e| e.id()).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut store = store(1);
        let updated = store
            .update(Uuid::new_v4(), ElementPatch::bounds(Rect::ZERO))
            .unwrap();
        assert!(!updated);
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let mut store = store(1);
        let id = store.add(rect(0)).unwrap();
        let before = store.get(id).unwrap().updated_at;
        store
            .update(id, ElementPatch::bounds(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        assert!(store.get(id).unwrap().updated_at > before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = store(1);
        let id = store.add(rect(0)).unwrap();
        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert_eq!(store.history().len(), 3);
    }

    #[test]
    fn test_transient_updates_commit_once() {
        let mut store = store(1);
        let id = store.add(rect(0)).unwrap();
        for i in 0..10 {
            store
                .update_transient(id, ElementPatch::bounds(Rect::new(0.0, 0.0, i as f64, 1.0)))
                .unwrap();
        }
        assert_eq!(store.history().len(), 2);
        assert!(store.commit_transient());
        assert_eq!(store.history().len(), 3);
        assert!(!store.commit_transient());
    }

    #[test]
    fn test_selection_ignores_unknown_ids() {
        let mut store = store(1);
        let id = store.add(rect(0)).unwrap();
        store.select([id, Uuid::new_v4()]);
        assert_eq!(store.selection().len(), 1);
        store.remove(id);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_start_edit_requires_text() {
        let mut store = store(1);
        let shape = store.add(rect(0)).unwrap();
        assert_eq!(store.start_edit(shape), Err(EditError::NotEditable(shape)));
        let label = store.add(text(0, "hi")).unwrap();
        assert!(store.start_edit(label).is_ok());
        assert!(store.is_editing(label));
    }

    #[test]
    fn test_reset_requires_source() {
        let mut store = store(1);
        let id = store.add(text(0, "added")).unwrap();
        assert_eq!(store.reset_to_original(id), Err(EditError::NoOriginalText(id)));
    }

    #[test]
    fn test_undo_broadcasts_inverse() {
        let mut store = store(1);
        let id = store.add(rect(0)).unwrap();
        store.take_outbox();
        assert!(store.undo());
        let ops = store.take_outbox();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0].op, ElementOp::Remove { id: removed, .. } if removed == id));
    }

    #[test]
    fn test_remote_write_survives_undo() {
        let mut store = store(1);
        store.add(rect(0)).unwrap();

        let remote = rect(0);
        let remote_id = remote.id();
        let op = StampedOp::new(
            Stamp::new(100, PeerId::from("peer")),
            ElementOp::Add { element: remote },
        );
        assert!(store.apply_remote(&op).unwrap());
        assert_eq!(store.history().len(), 2);

        store.undo();
        assert!(store.get(remote_id).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_late_add_does_not_resurrect() {
        let mut store = store(1);
        let element = rect(0);
        let id = element.id();
        let remove = StampedOp::new(
            Stamp::new(5, PeerId::from("peer")),
            ElementOp::Remove { id, page_index: 0 },
        );
        let add = StampedOp::new(Stamp::new(3, PeerId::from("peer")), ElementOp::Add { element });
        assert!(!store.apply_remote(&remove).unwrap());
        assert!(!store.apply_remote(&add).unwrap());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_remote_op_on_missing_page_is_rejected() {
        let mut store = store(1);
        let op = StampedOp::new(
            Stamp::new(1, PeerId::from("peer")),
            ElementOp::Remove {
                id: Uuid::new_v4(),
                page_index: 4,
            },
        );
        assert!(matches!(
            store.apply_remote(&op),
            Err(EditError::InvalidPageIndex { .. })
        ));
    }

    #[test]
    fn test_elements_at_topmost_first() {
        let mut store = store(1);
        let vp = Viewport::new(100.0, 100.0, 2.0);
        let below = store.add(rect(0)).unwrap();
        let above = store.add(rect(0)).unwrap();
        // Page point (20, 20) is device (40, 160) at zoom 2.
        let hits = store.elements_at(0, Point::new(40.0, 160.0), &vp, 1.0);
        assert_eq!(hits, vec![above, below]);
        assert!(store.elements_at(0, Point::new(190.0, 10.0), &vp, 1.0).is_empty());
    }
}
