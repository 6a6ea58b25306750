//! End-to-end behavior of an editing session.

use kurbo::{Point, Rect, Vec2};
use pagemark_core::element::{ShapePayload, TextPayload};
use pagemark_core::{
    EditableElement, EditingSession, ElementPatch, ElementPayload, PeerId, SessionConfig,
    TextFragment, ToolKind, Viewport,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(peer: &str, pages: usize) -> EditingSession {
    init_logger();
    EditingSession::open(SessionConfig::default(), PeerId::from(peer), pages)
}

fn rect(page: usize, x: f64) -> EditableElement {
    EditableElement::new(
        page,
        Rect::new(x, 0.0, x + 10.0, 10.0),
        ElementPayload::Rectangle(ShapePayload::default()),
    )
}

fn fragments() -> Vec<TextFragment> {
    vec![
        TextFragment::new("f0", "Invoice", [18.0, 0.0, 0.0, 18.0, 72.0, 720.0], 70.0, 18.0),
        TextFragment::new("f1", "Total: 10", [12.0, 0.0, 0.0, 12.0, 72.0, 690.0], 55.0, 12.0),
    ]
}

#[test]
fn undo_then_redo_reproduces_final_state() {
    let mut session = session("a", 2);
    let a = session.add(rect(0, 0.0)).unwrap();
    let b = session.add(rect(1, 20.0)).unwrap();
    session
        .update(a, ElementPatch::bounds(Rect::new(5.0, 5.0, 50.0, 50.0)))
        .unwrap();
    session.move_element(b, Vec2::new(3.0, 4.0)).unwrap();
    session.remove(a);
    session.add(rect(0, 40.0)).unwrap();
    let ops = 6;

    let final_state = session.store().all().to_vec();
    for _ in 0..ops {
        assert!(session.undo());
    }
    assert!(session.store().is_empty());
    assert!(!session.undo());
    for _ in 0..ops {
        assert!(session.redo());
    }
    assert!(!session.redo());
    assert_eq!(session.store().all(), final_state.as_slice());
}

#[test]
fn only_one_text_element_is_edited_at_a_time() {
    let mut session = session("a", 1);
    let vp = Viewport::new(612.0, 792.0, 1.0);
    let report = session.reconcile(0, &fragments(), &vp).unwrap();
    let a = report.projections[0].element_id;
    let b = report.projections[1].element_id;

    session.start_edit(a).unwrap();
    session.start_edit(b).unwrap();
    assert!(!session.store().is_editing(a));
    assert!(session.store().is_editing(b));

    assert!(!session.cancel_edit(a));
    assert!(session.cancel_edit(b));
    assert_eq!(session.store().editing(), None);
}

#[test]
fn reconciliation_is_idempotent() {
    let mut session = session("a", 1);
    let vp = Viewport::new(612.0, 792.0, 1.5);
    session.reconcile(0, &fragments(), &vp).unwrap();
    let first = session.store().all().to_vec();

    let report = session.reconcile(0, &fragments(), &vp).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(session.store().all(), first.as_slice());
}

#[test]
fn zoom_change_keeps_projections_and_edits() {
    let mut session = session("a", 1);
    let vp = Viewport::new(612.0, 792.0, 1.0);
    let report = session.reconcile(0, &fragments(), &vp).unwrap();
    let id = report.projections[1].element_id;
    session.commit_edit(id, "Total: 12").unwrap();

    let zoomed = vp.with_zoom(3.0);
    let report = session.reconcile(0, &fragments(), &zoomed).unwrap();
    assert_eq!(session.store().len(), 2);
    let projection = report
        .projections
        .iter()
        .find(|p| p.element_id == id)
        .unwrap();
    assert!(projection.is_modified);
    assert!((projection.device_bounds.x0 - 216.0).abs() < 1e-9);
    assert!((projection.font_size - 36.0).abs() < 1e-9);
}

#[test]
fn reset_always_clears_modified() {
    let mut session = session("a", 1);
    let vp = Viewport::new(612.0, 792.0, 1.0);
    let report = session.reconcile(0, &fragments(), &vp).unwrap();
    let id = report.projections[0].element_id;
    let is_modified = |s: &EditingSession| s.store().get(id).unwrap().as_text().unwrap().is_modified();

    session.commit_edit(id, "Receipt").unwrap();
    assert!(is_modified(&session));
    session.reset_to_original(id).unwrap();
    assert!(!is_modified(&session));
    session.commit_edit(id, "Invoice").unwrap();
    assert!(!is_modified(&session));
    session.reset_to_original(id).unwrap();
    assert!(!is_modified(&session));
    assert!(session.export().replacements.is_empty());
}

#[test]
fn undo_keeps_reconciled_text() {
    let mut session = session("a", 1);
    session.add(rect(0, 0.0)).unwrap();
    let vp = Viewport::new(612.0, 792.0, 1.0);
    session.reconcile(0, &fragments(), &vp).unwrap();

    session.undo();
    assert_eq!(session.store().len(), 2);
    assert!(session.store().all().iter().all(|e| e.as_text().is_some()));
}

#[test]
fn tap_with_pen_creates_nothing() {
    let mut session = session("a", 1);
    let vp = Viewport::new(612.0, 792.0, 1.0);
    session.set_tool(ToolKind::Pen);
    session.pointer_down(0, Point::new(100.0, 100.0), vp);
    assert_eq!(session.pointer_up(Point::new(100.0, 100.0)).unwrap(), None);
    assert!(session.store().is_empty());
    assert_eq!(session.store().history().len(), 1);
}

#[test]
fn snapshot_round_trip_restores_elements() {
    let mut original = session("a", 3);
    original.add(rect(2, 0.0)).unwrap();
    let mut label = TextPayload::new("note to self", 11.0);
    label.color = pagemark_core::element::SerializableColor::new(200, 0, 0, 255);
    original
        .add(EditableElement::new(
            0,
            Rect::new(10.0, 10.0, 110.0, 21.0),
            ElementPayload::Text(label),
        ))
        .unwrap();
    let json = original.serialize_state().unwrap();

    let mut restored = session("b", 3);
    restored.restore_state(&json).unwrap();
    assert_eq!(restored.store().all(), original.store().all());
    assert!(!restored.store().can_undo());
    assert!(restored.store().clock_time() >= original.store().clock_time());
}

#[test]
fn restore_rejects_elements_on_missing_pages() {
    let mut original = session("a", 3);
    original.add(rect(2, 0.0)).unwrap();
    let json = original.serialize_state().unwrap();

    let mut smaller = session("b", 2);
    smaller.add(rect(0, 0.0)).unwrap();
    assert!(matches!(
        smaller.restore_state(&json),
        Err(pagemark_core::EditError::InvalidPageIndex { index: 2, .. })
    ));
    assert_eq!(smaller.store().len(), 1);
}
