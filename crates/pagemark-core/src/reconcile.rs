//! Projection of a page's extracted text fragments onto editable text elements.
//!
//! Each usable fragment becomes exactly one text element whose id is derived
//! from `(page, fragment id)`, so re-running reconciliation (after a zoom
//! change, on navigation back to the page, or on another peer) finds the
//! same element instead of creating a duplicate. Existing projections keep
//! their text and modification state; only their geometry is refreshed.

use crate::BoxFuture;
use crate::element::{
    EditableElement, ElementId, ElementPayload, FragmentId, TextPayload, TextSource,
};
use crate::error::EditResult;
use crate::store::ElementStore;
use crate::viewport::Viewport;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// One text run as supplied by the text extractor.
///
/// Every field except the id is optional: extractors emit partial runs
/// (marked content, empty glyph runs) that must be filtered, not trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    #[serde(alias = "fragmentId")]
    pub fragment_id: FragmentId,
    #[serde(default, rename = "str")]
    pub text: Option<String>,
    /// Text matrix `[a, b, c, d, e, f]` in page space.
    #[serde(default, alias = "transformMatrix")]
    pub transform: Option<Vec<f64>>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default, alias = "fontName")]
    pub font_name: Option<String>,
}

impl TextFragment {
    pub fn new(
        fragment_id: impl Into<String>,
        text: impl Into<String>,
        transform: [f64; 6],
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            fragment_id: FragmentId::new(fragment_id),
            text: Some(text.into()),
            transform: Some(transform.to_vec()),
            width: Some(width),
            height: Some(height),
            font_name: None,
        }
    }
}

/// Supplies the text fragments of a page.
pub trait TextExtractor {
    fn extract(&self, page_index: usize) -> BoxFuture<'_, EditResult<Vec<TextFragment>>>;
}

/// Why a fragment was not projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing transform")]
    MissingTransform,
    #[error("transform is not six finite numbers")]
    InvalidTransform,
    #[error("missing text")]
    MissingText,
    #[error("blank text")]
    EmptyText,
    #[error("missing width or height")]
    MissingDimensions,
    #[error("width or height is not a usable size")]
    InvalidDimensions,
    #[error("transform yields no font size")]
    DegenerateFontSize,
    #[error("fragment id already seen on this page")]
    DuplicateFragment,
}

/// A fragment that did not reach the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFragment {
    pub fragment_id: FragmentId,
    pub reason: SkipReason,
}

/// Device-space placement of one projected text element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProjection {
    pub element_id: ElementId,
    pub fragment_id: FragmentId,
    /// Bounds in device pixels for the viewport the projection was made for.
    pub device_bounds: Rect,
    /// Font size in device pixels.
    pub font_size: f64,
    pub is_modified: bool,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub page_index: usize,
    /// Fragments supplied.
    pub total: usize,
    /// New elements created.
    pub created: usize,
    /// Existing elements whose geometry changed.
    pub repositioned: usize,
    /// Existing elements left as they were.
    pub unchanged: usize,
    /// Fragments whose element the user deleted.
    pub deleted: usize,
    pub skipped: Vec<SkippedFragment>,
    /// Every projection on the page after the pass.
    pub projections: Vec<TextProjection>,
}

impl ReconcileReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page {}: {} of {} fragments skipped ({} created, {} repositioned, {} unchanged)",
            self.page_index,
            self.skipped_count(),
            self.total,
            self.created,
            self.repositioned,
            self.unchanged
        )
    }
}

/// Validated fragment geometry.
struct Resolved {
    text: String,
    transform: [f64; 6],
    font_size: f64,
    width: f64,
    height: f64,
}

fn resolve(fragment: &TextFragment) -> Result<Resolved, SkipReason> {
    let matrix = fragment
        .transform
        .as_deref()
        .ok_or(SkipReason::MissingTransform)?;
    let transform: [f64; 6] = matrix
        .try_into()
        .map_err(|_| SkipReason::InvalidTransform)?;
    if transform.iter().any(|v| !v.is_finite()) {
        return Err(SkipReason::InvalidTransform);
    }

    let text = fragment.text.as_deref().ok_or(SkipReason::MissingText)?;
    if text.trim().is_empty() {
        return Err(SkipReason::EmptyText);
    }

    let (Some(width), Some(height)) = (fragment.width, fragment.height) else {
        return Err(SkipReason::MissingDimensions);
    };
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height < 0.0 {
        return Err(SkipReason::InvalidDimensions);
    }

    let font_size = transform[0].hypot(transform[1]);
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(SkipReason::DegenerateFontSize);
    }

    Ok(Resolved {
        text: text.to_string(),
        transform,
        font_size,
        width,
        height,
    })
}

/// Stable element id for a fragment on a page.
pub fn projection_id(page_index: usize, fragment_id: &FragmentId) -> ElementId {
    let name = format!("pagemark:page:{page_index}:fragment:{fragment_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Page-space box of a fragment: baseline origin, advance width and the
/// larger of the reported height and the font size.
fn page_bounds(resolved: &Resolved) -> Rect {
    let [.., e, f] = resolved.transform;
    Rect::new(
        e,
        f,
        e + resolved.width,
        f + resolved.height.max(resolved.font_size),
    )
}

/// Project a page's fragments into `store`.
///
/// The merge is untracked: it never creates an undo step and is kept
/// across undo and redo.
pub fn reconcile_page(
    store: &mut ElementStore,
    page_index: usize,
    fragments: &[TextFragment],
    viewport: &Viewport,
) -> EditResult<ReconcileReport> {
    store.context().check_page(page_index)?;

    let mut report = ReconcileReport {
        page_index,
        total: fragments.len(),
        ..Default::default()
    };
    let mut seen = std::collections::HashSet::new();

    for fragment in fragments {
        if !seen.insert(fragment.fragment_id.clone()) {
            report.skipped.push(SkippedFragment {
                fragment_id: fragment.fragment_id.clone(),
                reason: SkipReason::DuplicateFragment,
            });
            continue;
        }
        let resolved = match resolve(fragment) {
            Ok(resolved) => resolved,
            Err(reason) => {
                log::debug!("fragment {} skipped: {reason}", fragment.fragment_id);
                report.skipped.push(SkippedFragment {
                    fragment_id: fragment.fragment_id.clone(),
                    reason,
                });
                continue;
            }
        };

        let id = projection_id(page_index, &fragment.fragment_id);
        let bounds = page_bounds(&resolved);
        let source = TextSource {
            fragment_id: fragment.fragment_id.clone(),
            original_text: resolved.text.clone(),
            transform: resolved.transform,
            font_name: fragment.font_name.clone().unwrap_or_default(),
            width: resolved.width,
            height: resolved.height,
        };

        match store.get(id).and_then(EditableElement::as_text) {
            Some(existing) => {
                // The user's text and the first-seen original text survive.
                let original_text = existing
                    .original_text()
                    .map(str::to_owned)
                    .unwrap_or_else(|| resolved.text.clone());
                let source = TextSource {
                    original_text,
                    ..source
                };
                let unchanged = existing.source.as_ref() == Some(&source)
                    && store.get(id).is_some_and(|e| e.bounds == bounds);
                if unchanged {
                    report.unchanged += 1;
                } else {
                    store.reposition_text(id, bounds, &source);
                    report.repositioned += 1;
                }
            }
            None if store.is_tombstoned(id) => report.deleted += 1,
            None => {
                let mut payload = TextPayload::new(resolved.text, resolved.font_size);
                payload.source = Some(source);
                let mut element =
                    EditableElement::with_id(id, page_index, bounds, ElementPayload::Text(payload));
                element.created_at = store.clock_time();
                element.updated_at = store.clock_time();
                store.put_untracked(element)?;
                report.created += 1;
            }
        }
    }

    report.projections = text_projections(store, page_index, viewport);
    if report.skipped.is_empty() {
        log::debug!("{report}");
    } else {
        log::info!("{report}");
    }
    Ok(report)
}

/// Fetch a page's fragments from `extractor` and reconcile them.
pub async fn reconcile_from<E: TextExtractor + ?Sized>(
    extractor: &E,
    store: &mut ElementStore,
    page_index: usize,
    viewport: &Viewport,
) -> EditResult<ReconcileReport> {
    store.context().check_page(page_index)?;
    let fragments = extractor.extract(page_index).await?;
    reconcile_page(store, page_index, &fragments, viewport)
}

/// Device placement of every projected text element on a page.
pub fn text_projections(
    store: &ElementStore,
    page_index: usize,
    viewport: &Viewport,
) -> Vec<TextProjection> {
    store
        .by_page(page_index)
        .filter_map(|element| {
            let text = element.as_text()?;
            let source = text.source.as_ref()?;
            Some(TextProjection {
                element_id: element.id(),
                fragment_id: source.fragment_id.clone(),
                device_bounds: element.device_bounds(viewport),
                font_size: viewport.length_to_device(text.font_size),
                is_modified: text.is_modified(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PeerId;
    use crate::config::{SessionConfig, SessionContext};

    fn store() -> ElementStore {
        ElementStore::new(SessionContext::new(
            SessionConfig::default(),
            PeerId::from("me"),
            2,
        ))
    }

    fn fragment(id: &str, text: &str) -> TextFragment {
        TextFragment::new(id, text, [12.0, 0.0, 0.0, 12.0, 72.0, 700.0], 48.0, 10.0)
    }

    #[test]
    fn test_font_size_from_matrix() {
        let mut store = store();
        let rotated = TextFragment::new("r", "tilt", [3.0, 4.0, -4.0, 3.0, 10.0, 10.0], 20.0, 5.0);
        let vp = Viewport::new(612.0, 792.0, 2.0);
        let report = reconcile_page(&mut store, 0, &[rotated], &vp).unwrap();
        let projection = &report.projections[0];
        assert!((projection.font_size - 10.0).abs() < 1e-9);
        let el = store.get(projection.element_id).unwrap();
        assert!((el.as_text().unwrap().font_size - 5.0).abs() < 1e-9);
        assert_eq!(el.bounds, Rect::new(10.0, 10.0, 30.0, 15.0));
    }

    #[test]
    fn test_skip_reasons_are_counted() {
        let mut store = store();
        let mut no_transform = fragment("a", "x");
        no_transform.transform = None;
        let mut short_transform = fragment("b", "x");
        short_transform.transform = Some(vec![1.0, 0.0]);
        let mut no_text = fragment("c", "x");
        no_text.text = None;
        let blank = fragment("d", "   ");
        let mut no_size = fragment("e", "x");
        no_size.height = None;
        let flat = TextFragment::new("f", "x", [0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 5.0, 5.0);
        let good = fragment("g", "kept");

        let vp = Viewport::new(612.0, 792.0, 1.0);
        let report = reconcile_page(
            &mut store,
            0,
            &[no_transform, short_transform, no_text, blank, no_size, flat, good],
            &vp,
        )
        .unwrap();

        let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingTransform,
                SkipReason::InvalidTransform,
                SkipReason::MissingText,
                SkipReason::EmptyText,
                SkipReason::MissingDimensions,
                SkipReason::DegenerateFontSize,
            ]
        );
        assert_eq!(report.created, 1);
        assert_eq!(store.len(), 1);
        assert!(report.to_string().contains("6 of 7 fragments skipped"));
    }

    #[test]
    fn test_duplicate_fragment_ids_project_once() {
        let mut store = store();
        let vp = Viewport::new(612.0, 792.0, 1.0);
        let report =
            reconcile_page(&mut store, 0, &[fragment("a", "one"), fragment("a", "two")], &vp).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped[0].reason, SkipReason::DuplicateFragment);
    }

    #[test]
    fn test_merge_keeps_user_text() {
        let mut store = store();
        let vp = Viewport::new(612.0, 792.0, 1.0);
        let report = reconcile_page(&mut store, 0, &[fragment("a", "Hello")], &vp).unwrap();
        let id = report.projections[0].element_id;
        store.commit_edit(id, "Howdy").unwrap();

        let zoomed = vp.with_zoom(2.0);
        let mut moved = fragment("a", "Hello");
        moved.transform = Some(vec![12.0, 0.0, 0.0, 12.0, 80.0, 700.0]);
        let report = reconcile_page(&mut store, 0, &[moved], &zoomed).unwrap();

        assert_eq!(report.repositioned, 1);
        assert_eq!(store.len(), 1);
        let text = store.get(id).unwrap().as_text().unwrap();
        assert_eq!(text.text, "Howdy");
        assert!(text.is_modified());
        assert!((store.get(id).unwrap().bounds.x0 - 80.0).abs() < f64::EPSILON);
        assert!((report.projections[0].device_bounds.x0 - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_undo_after_reposition_restores_old_text() {
        let mut store = store();
        let vp = Viewport::new(612.0, 792.0, 1.0);
        let report = reconcile_page(&mut store, 0, &[fragment("a", "Hello")], &vp).unwrap();
        let id = report.projections[0].element_id;
        store.commit_edit(id, "Howdy").unwrap();

        let mut moved = fragment("a", "Hello");
        moved.transform = Some(vec![12.0, 0.0, 0.0, 12.0, 80.0, 700.0]);
        let report = reconcile_page(&mut store, 0, &[moved], &vp).unwrap();
        assert_eq!(report.repositioned, 1);

        assert!(store.undo());
        let el = store.get(id).unwrap();
        assert_eq!(el.as_text().unwrap().text, "Hello");
        assert!(!el.as_text().unwrap().is_modified());
        assert!((el.bounds.x0 - 80.0).abs() < f64::EPSILON);

        assert!(store.redo());
        assert_eq!(store.get(id).unwrap().as_text().unwrap().text, "Howdy");
        assert!((store.get(id).unwrap().bounds.x0 - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_projection_ids_are_per_page() {
        let id = FragmentId::new("f1");
        assert_eq!(projection_id(0, &id), projection_id(0, &id));
        assert_ne!(projection_id(0, &id), projection_id(1, &id));
    }

    #[test]
    fn test_deleted_projection_stays_deleted() {
        let mut store = store();
        let vp = Viewport::new(612.0, 792.0, 1.0);
        let report = reconcile_page(&mut store, 0, &[fragment("a", "Hello")], &vp).unwrap();
        store.remove(report.projections[0].element_id);
        let report = reconcile_page(&mut store, 0, &[fragment("a", "Hello")], &vp).unwrap();
        assert_eq!(report.deleted, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_fragment_json_accepts_extractor_names() {
        let json = r#"{
            "fragmentId": "p0-3",
            "str": "Total",
            "transformMatrix": [10, 0, 0, 10, 50, 60],
            "width": 25.5,
            "height": 10,
            "fontName": "g_d0_f2"
        }"#;
        let fragment: TextFragment = serde_json::from_str(json).unwrap();
        assert_eq!(fragment.text.as_deref(), Some("Total"));
        assert_eq!(fragment.font_name.as_deref(), Some("g_d0_f2"));
        assert_eq!(fragment.transform.map(|t| t.len()), Some(6));
    }
}
