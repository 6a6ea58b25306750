//! Element model: user-visible marks placed on document pages.

mod geometry;
mod payload;

pub use geometry::{
    bounds_of_points, point_in_ellipse, point_to_polyline_dist, point_to_segment_dist,
};
pub use payload::{
    ArrowPayload, DrawingPayload, FragmentId, ImageFormat, ImagePayload, InkTool, NotePayload,
    SerializableColor, ShapePayload, SignaturePayload, SignatureType, TextPayload, TextSource,
};

use crate::error::{EditError, EditResult};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Element variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Drawing,
    Rectangle,
    Circle,
    Arrow,
    Image,
    Signature,
    Note,
}

/// Type-tagged element data, one payload shape per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementPayload {
    Text(TextPayload),
    Drawing(DrawingPayload),
    Rectangle(ShapePayload),
    Circle(ShapePayload),
    Arrow(ArrowPayload),
    Image(ImagePayload),
    Signature(SignaturePayload),
    Note(NotePayload),
}

impl ElementPayload {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementPayload::Text(_) => ElementKind::Text,
            ElementPayload::Drawing(_) => ElementKind::Drawing,
            ElementPayload::Rectangle(_) => ElementKind::Rectangle,
            ElementPayload::Circle(_) => ElementKind::Circle,
            ElementPayload::Arrow(_) => ElementKind::Arrow,
            ElementPayload::Image(_) => ElementKind::Image,
            ElementPayload::Signature(_) => ElementKind::Signature,
            ElementPayload::Note(_) => ElementKind::Note,
        }
    }

    /// Bounds implied by the payload itself, for kinds whose extent is
    /// defined by their geometry rather than by a user-drawn box.
    pub fn intrinsic_bounds(&self) -> Option<Rect> {
        match self {
            ElementPayload::Drawing(d) => Some(bounds_of_points(&d.path)),
            ElementPayload::Arrow(a) => Some(Rect::from_points(a.start, a.end)),
            _ => None,
        }
    }

    fn translate(&mut self, delta: Vec2) {
        match self {
            ElementPayload::Drawing(d) => {
                for p in &mut d.path {
                    *p += delta;
                }
            }
            ElementPayload::Arrow(a) => {
                a.start += delta;
                a.end += delta;
            }
            ElementPayload::Text(_)
            | ElementPayload::Rectangle(_)
            | ElementPayload::Circle(_)
            | ElementPayload::Image(_)
            | ElementPayload::Signature(_)
            | ElementPayload::Note(_) => {}
        }
    }

    pub fn as_text(&self) -> Option<&TextPayload> {
        match self {
            ElementPayload::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// One user-visible mark on one page.
///
/// Geometry is kept in page space; device placement is always derived
/// from the active [`Viewport`], so zooming never moves stored bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableElement {
    id: ElementId,
    page_index: usize,
    /// Page-space bounding box (origin bottom-left).
    pub bounds: Rect,
    pub payload: ElementPayload,
    /// Logical time of creation.
    pub created_at: u64,
    /// Logical time of the last write.
    pub updated_at: u64,
}

impl EditableElement {
    /// Create an element with a fresh id.
    ///
    /// Drawings and arrows take their bounds from their geometry when
    /// `bounds` is empty.
    pub fn new(page_index: usize, bounds: Rect, payload: ElementPayload) -> Self {
        Self::with_id(Uuid::new_v4(), page_index, bounds, payload)
    }

    /// Create an element with a known id (snapshots, remote peers).
    pub fn with_id(id: ElementId, page_index: usize, bounds: Rect, payload: ElementPayload) -> Self {
        let bounds = match payload.intrinsic_bounds() {
            Some(intrinsic) if bounds.area() == 0.0 => intrinsic,
            _ => bounds,
        };
        Self {
            id,
            page_index,
            bounds,
            payload,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn kind(&self) -> ElementKind {
        self.payload.kind()
    }

    pub fn as_text(&self) -> Option<&TextPayload> {
        self.payload.as_text()
    }

    /// Bounds on screen for the given viewport.
    pub fn device_bounds(&self, viewport: &Viewport) -> Rect {
        viewport.rect_to_device(self.bounds)
    }

    /// Check if a page-space point hits this element.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match &self.payload {
            ElementPayload::Drawing(d) => {
                point_to_polyline_dist(point, &d.path) <= tolerance + d.stroke_width / 2.0
            }
            ElementPayload::Arrow(a) => {
                point_to_segment_dist(point, a.start, a.end) <= tolerance + a.stroke_width / 2.0
            }
            ElementPayload::Circle(_) => point_in_ellipse(point, self.bounds, tolerance),
            _ => self.bounds.inflate(tolerance, tolerance).contains(point),
        }
    }

    /// Merge a patch into this element.
    ///
    /// The payload is replaced wholesale; its kind must match.
    pub(crate) fn apply_patch(&mut self, patch: &ElementPatch) -> EditResult<()> {
        if let Some(payload) = &patch.payload {
            if payload.kind() != self.kind() {
                return Err(EditError::KindMismatch {
                    id: self.id,
                    expected: self.kind(),
                    found: payload.kind(),
                });
            }
            self.payload = payload.clone();
        }
        match (patch.bounds, patch.payload.as_ref().and_then(|p| p.intrinsic_bounds())) {
            (Some(bounds), _) => self.bounds = bounds,
            (None, Some(intrinsic)) => self.bounds = intrinsic,
            (None, None) => {}
        }
        Ok(())
    }

    /// Patch that moves this element by a page-space offset.
    pub fn translation(&self, delta: Vec2) -> ElementPatch {
        let mut payload = self.payload.clone();
        payload.translate(delta);
        ElementPatch {
            bounds: Some(self.bounds + delta),
            payload: Some(payload),
        }
    }
}

/// Partial update of an element's bounds and/or payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ElementPayload>,
}

impl ElementPatch {
    pub fn bounds(bounds: Rect) -> Self {
        Self {
            bounds: Some(bounds),
            payload: None,
        }
    }

    pub fn payload(payload: ElementPayload) -> Self {
        Self {
            bounds: None,
            payload: Some(payload),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none() && self.payload.is_none()
    }
}
