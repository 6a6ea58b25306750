//! Page-space / device-space transform.
//!
//! Page space is the document's native coordinate system: origin at the
//! bottom-left corner, y growing upward, unscaled. Device space is the
//! on-screen pixel grid: origin at the top-left, y growing downward,
//! scaled by the current zoom.

use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Smallest zoom a viewport accepts.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom a viewport accepts.
pub const MAX_ZOOM: f64 = 10.0;

/// The page size and zoom a page is displayed at.
///
/// Deserialized viewports go through [`Viewport::new`], so a saved zoom
/// outside the accepted range is clamped on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ViewportRepr")]
pub struct Viewport {
    /// Unscaled page width in page units.
    pub width: f64,
    /// Unscaled page height in page units.
    pub height: f64,
    /// Device pixels per page unit.
    pub zoom: f64,
}

#[derive(Deserialize)]
struct ViewportRepr {
    width: f64,
    height: f64,
    zoom: f64,
}

impl From<ViewportRepr> for Viewport {
    fn from(repr: ViewportRepr) -> Self {
        Viewport::new(repr.width, repr.height, repr.zoom)
    }
}

impl Viewport {
    /// Create a viewport for a page of the given size.
    pub fn new(width: f64, height: f64, zoom: f64) -> Self {
        Self {
            width,
            height,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// The same page at a different zoom.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self::new(self.width, self.height, zoom)
    }

    /// Whether the dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.zoom.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.zoom > 0.0
    }

    /// Size of the page on screen.
    pub fn device_size(&self) -> Size {
        Size::new(self.width * self.zoom, self.height * self.zoom)
    }

    /// Affine transform taking page space to device space.
    pub fn transform(&self) -> Affine {
        Affine::new([self.zoom, 0.0, 0.0, -self.zoom, 0.0, self.height * self.zoom])
    }

    /// Affine transform taking device space to page space.
    pub fn inverse_transform(&self) -> Affine {
        Affine::new([1.0 / self.zoom, 0.0, 0.0, -1.0 / self.zoom, 0.0, self.height])
    }

    /// Convert a page point to device coordinates.
    pub fn to_device(&self, page_point: Point) -> Point {
        Point::new(
            page_point.x * self.zoom,
            (self.height - page_point.y) * self.zoom,
        )
    }

    /// Convert a device point to page coordinates.
    pub fn to_page(&self, device_point: Point) -> Point {
        Point::new(
            device_point.x / self.zoom,
            self.height - device_point.y / self.zoom,
        )
    }

    /// Convert a page rectangle to its device-space rectangle.
    pub fn rect_to_device(&self, page_rect: Rect) -> Rect {
        Rect::from_points(
            self.to_device(Point::new(page_rect.x0, page_rect.y0)),
            self.to_device(Point::new(page_rect.x1, page_rect.y1)),
        )
    }

    /// Convert a device rectangle to its page-space rectangle.
    pub fn rect_to_page(&self, device_rect: Rect) -> Rect {
        Rect::from_points(
            self.to_page(Point::new(device_rect.x0, device_rect.y0)),
            self.to_page(Point::new(device_rect.x1, device_rect.y1)),
        )
    }

    /// Scale a page-space length to device pixels.
    pub fn length_to_device(&self, length: f64) -> f64 {
        length * self.zoom
    }

    /// Scale a device-space length to page units.
    pub fn length_to_page(&self, length: f64) -> f64 {
        length / self.zoom
    }
}
