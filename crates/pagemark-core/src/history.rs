//! Linear undo/redo over element-list snapshots.

use crate::element::EditableElement;

/// An immutable snapshot of the full element list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryFrame {
    elements: Vec<EditableElement>,
}

impl HistoryFrame {
    pub fn new(elements: Vec<EditableElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[EditableElement] {
        &self.elements
    }

    /// Mutable access for folding untracked writes into old frames.
    pub(crate) fn elements_mut(&mut self) -> &mut Vec<EditableElement> {
        &mut self.elements
    }
}

/// Ordered frames plus a cursor.
///
/// `cursor` is `None` before the first commit ("before first frame").
#[derive(Debug, Clone)]
pub struct HistoryStack {
    frames: Vec<HistoryFrame>,
    cursor: Option<usize>,
    /// Maximum frames kept; 0 means unbounded.
    limit: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::with_limit(0)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            cursor: None,
            limit,
        }
    }

    /// Truncate everything after the cursor, append `frame`, advance.
    pub fn commit(&mut self, frame: HistoryFrame) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.frames.truncate(keep);
        self.frames.push(frame);

        if self.limit > 0 && self.frames.len() > self.limit {
            let excess = self.frames.len() - self.limit;
            self.frames.drain(..excess);
            log::debug!("history limit reached, dropped {excess} oldest frame(s)");
        }
        self.cursor = Some(self.frames.len() - 1);
    }

    /// Step back one frame. Returns the frame to restore, if any.
    pub fn undo(&mut self) -> Option<&HistoryFrame> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.frames.get(c - 1)
            }
            _ => None,
        }
    }

    /// Step forward one frame. Returns the frame to restore, if any.
    pub fn redo(&mut self) -> Option<&HistoryFrame> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.frames.len() && self.cursor.is_some() {
            self.cursor = Some(next);
            self.frames.get(next)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.frames.len())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current(&self) -> Option<&HistoryFrame> {
        self.cursor.and_then(|c| self.frames.get(c))
    }

    /// Drop every frame and start over from `frame`.
    pub fn reset(&mut self, frame: HistoryFrame) {
        self.frames.clear();
        self.cursor = None;
        self.commit(frame);
    }

    /// Apply the same edit to every frame, past and future.
    pub(crate) fn fold_into_frames(&mut self, mut edit: impl FnMut(&mut Vec<EditableElement>)) {
        for frame in &mut self.frames {
            edit(frame.elements_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementPayload, ShapePayload};
    use kurbo::Rect;

    fn frame_with(n: usize) -> HistoryFrame {
        HistoryFrame::new(
            (0..n)
                .map(|i| {
                    EditableElement::new(
                        0,
                        Rect::new(0.0, 0.0, i as f64 + 1.0, 1.0),
                        ElementPayload::Rectangle(ShapePayload::default()),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_empty_stack_is_before_first_frame() {
        let mut history = HistoryStack::new();
        assert_eq!(history.cursor(), None);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_stops_at_first_frame() {
        let mut history = HistoryStack::new();
        history.commit(frame_with(0));
        history.commit(frame_with(1));
        assert_eq!(history.undo().map(|f| f.elements().len()), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_commit_truncates_redo_tail() {
        let mut history = HistoryStack::new();
        history.commit(frame_with(0));
        history.commit(frame_with(1));
        history.commit(frame_with(2));
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.commit(frame_with(5));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().map(|f| f.elements().len()), Some(5));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = HistoryStack::with_limit(3);
        for n in 0..5 {
            history.commit(frame_with(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        history.undo();
        history.undo();
        assert!(!history.can_undo());
        assert_eq!(history.current().map(|f| f.elements().len()), Some(2));
    }
}
