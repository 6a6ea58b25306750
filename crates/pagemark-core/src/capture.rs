//! Freehand ink capture.
//!
//! Pointer input arrives in device space. While a stroke is in progress
//! only the newest segment is drawn to the ink layer; on release the whole
//! path is converted to page space with the viewport that was active at
//! pointer-down and committed as a single drawing element.

use crate::config::SessionConfig;
use crate::element::{
    DrawingPayload, EditableElement, ElementId, ElementPayload, InkTool, SerializableColor,
};
use crate::error::{EditError, EditResult};
use crate::store::ElementStore;
use crate::viewport::Viewport;
use kurbo::{Point, Rect};
use peniko::BlendMode;

/// Stroke style for one freehand tool, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub tool: InkTool,
    pub color: SerializableColor,
    /// Width in device pixels.
    pub width: f64,
}

impl Brush {
    /// The configured brush for a tool.
    pub fn for_tool(tool: InkTool, pen_color: SerializableColor, config: &SessionConfig) -> Self {
        match tool {
            InkTool::Pen => Self {
                tool,
                color: pen_color,
                width: config.pen_width,
            },
            InkTool::Highlighter => Self {
                tool,
                color: SerializableColor::highlight().with_opacity(config.highlighter_opacity),
                width: config.highlighter_width,
            },
        }
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.tool.blend_mode()
    }
}

/// Receives incremental stroke segments while a stroke is captured.
///
/// Implemented by the ink layer of the rendering pipeline.
pub trait InkSink {
    /// Draw one device-space segment.
    fn stroke_segment(&mut self, from: Point, to: Point, brush: &Brush) -> EditResult<()>;
}

#[derive(Debug, Clone, Default)]
enum CaptureState {
    #[default]
    Idle,
    Capturing {
        page_index: usize,
        viewport: Viewport,
        brush: Brush,
        /// Device-space points in drawing order.
        path: Vec<Point>,
    },
}

/// Idle / capturing state machine for pen and highlighter strokes.
#[derive(Debug, Clone)]
pub struct FreehandCapture {
    state: CaptureState,
    pen_color: SerializableColor,
}

impl Default for FreehandCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl FreehandCapture {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            pen_color: SerializableColor::black(),
        }
    }

    pub fn set_pen_color(&mut self, color: SerializableColor) {
        self.pen_color = color;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing { .. })
    }

    /// Device-space points of the stroke in progress.
    pub fn current_path(&self) -> &[Point] {
        match &self.state {
            CaptureState::Capturing { path, .. } => path,
            CaptureState::Idle => &[],
        }
    }

    /// Start a stroke at `point`.
    ///
    /// `viewport` is the transform valid right now; capture never waits for
    /// a render in flight.
    pub fn pointer_down(
        &mut self,
        page_index: usize,
        point: Point,
        tool: InkTool,
        viewport: Viewport,
        config: &SessionConfig,
    ) {
        if self.is_capturing() {
            log::debug!("pointer down during capture, previous stroke abandoned");
        }
        self.state = CaptureState::Capturing {
            page_index,
            viewport,
            brush: Brush::for_tool(tool, self.pen_color, config),
            path: vec![point],
        };
    }

    /// Extend the stroke and draw the new segment.
    pub fn pointer_move(&mut self, point: Point, sink: &mut dyn InkSink) {
        let CaptureState::Capturing { brush, path, .. } = &mut self.state else {
            return;
        };
        let Some(&previous) = path.last() else {
            return;
        };
        path.push(point);
        match sink.stroke_segment(previous, point, brush) {
            Ok(()) => {}
            Err(EditError::SurfaceNotReady(reason)) => {
                log::debug!("ink segment not drawn: {reason}");
            }
            Err(err) => log::warn!("ink segment failed: {err}"),
        }
    }

    /// Finish the stroke.
    ///
    /// Strokes with fewer than two points are discarded. Otherwise one
    /// drawing element is added to `store` (one history frame).
    pub fn pointer_up(&mut self, store: &mut ElementStore) -> EditResult<Option<ElementId>> {
        let CaptureState::Capturing {
            page_index,
            viewport,
            brush,
            path,
        } = std::mem::take(&mut self.state)
        else {
            return Ok(None);
        };

        if path.len() < 2 {
            log::debug!("stroke with {} point(s) discarded", path.len());
            return Ok(None);
        }

        let page_path: Vec<Point> = path.iter().map(|p| viewport.to_page(*p)).collect();
        let payload = ElementPayload::Drawing(DrawingPayload {
            path: page_path,
            stroke_color: brush.color,
            stroke_width: viewport.length_to_page(brush.width),
            tool: brush.tool,
        });
        let element = EditableElement::new(page_index, Rect::ZERO, payload);
        store.add(element).map(Some)
    }

    /// Drop the stroke in progress.
    pub fn cancel(&mut self) {
        self.state = CaptureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PeerId;
    use crate::config::SessionContext;

    #[derive(Default)]
    struct RecordingSink {
        segments: Vec<(Point, Point)>,
        ready: bool,
    }

    impl InkSink for RecordingSink {
        fn stroke_segment(&mut self, from: Point, to: Point, _brush: &Brush) -> EditResult<()> {
            if !self.ready {
                return Err(EditError::SurfaceNotReady("ink".into()));
            }
            self.segments.push((from, to));
            Ok(())
        }
    }

    fn store() -> ElementStore {
        ElementStore::new(SessionContext::new(
            SessionConfig::default(),
            PeerId::from("me"),
            1,
        ))
    }

    #[test]
    fn test_segments_are_incremental() {
        let config = SessionConfig::default();
        let mut capture = FreehandCapture::new();
        let mut sink = RecordingSink {
            ready: true,
            ..Default::default()
        };
        let vp = Viewport::new(100.0, 100.0, 1.0);
        capture.pointer_down(0, Point::new(0.0, 0.0), InkTool::Pen, vp, &config);
        capture.pointer_move(Point::new(1.0, 0.0), &mut sink);
        capture.pointer_move(Point::new(2.0, 0.0), &mut sink);
        assert_eq!(
            sink.segments,
            vec![
                (Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
                (Point::new(1.0, 0.0), Point::new(2.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_capture_continues_without_surface() {
        let config = SessionConfig::default();
        let mut capture = FreehandCapture::new();
        let mut sink = RecordingSink::default();
        let mut store = store();
        let vp = Viewport::new(100.0, 100.0, 1.0);
        capture.pointer_down(0, Point::new(5.0, 5.0), InkTool::Pen, vp, &config);
        capture.pointer_move(Point::new(10.0, 10.0), &mut sink);
        assert!(capture.pointer_up(&mut store).unwrap().is_some());
        assert!(sink.segments.is_empty());
    }

    #[test]
    fn test_stroke_stored_in_page_space() {
        let config = SessionConfig::default();
        let mut capture = FreehandCapture::new();
        let mut sink = RecordingSink {
            ready: true,
            ..Default::default()
        };
        let mut store = store();
        let vp = Viewport::new(200.0, 100.0, 2.0);
        capture.pointer_down(0, Point::new(20.0, 20.0), InkTool::Highlighter, vp, &config);
        capture.pointer_move(Point::new(60.0, 40.0), &mut sink);
        let id = capture.pointer_up(&mut store).unwrap().unwrap();

        let el = store.get(id).unwrap();
        assert_eq!(el.bounds, Rect::new(10.0, 80.0, 30.0, 90.0));
        match &el.payload {
            ElementPayload::Drawing(d) => {
                assert_eq!(d.tool, InkTool::Highlighter);
                assert!((d.stroke_width - config.highlighter_width / 2.0).abs() < f64::EPSILON);
                assert!(d.stroke_color.a < 255);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(!capture.is_capturing());
    }

    #[test]
    fn test_move_without_down_is_ignored() {
        let mut capture = FreehandCapture::new();
        let mut sink = RecordingSink {
            ready: true,
            ..Default::default()
        };
        capture.pointer_move(Point::new(1.0, 1.0), &mut sink);
        assert!(sink.segments.is_empty());
        assert!(capture.current_path().is_empty());
    }
}
