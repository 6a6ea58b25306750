//! Tool system: turns pointer gestures into new elements.

use crate::capture::{FreehandCapture, InkSink};
use crate::config::SessionConfig;
use crate::element::{
    ArrowPayload, EditableElement, ElementId, ElementPayload, InkTool, NotePayload,
    SerializableColor, ShapePayload, TextPayload,
};
use crate::error::EditResult;
use crate::store::ElementStore;
use crate::viewport::Viewport;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Gestures shorter than this (device pixels) count as clicks.
const CLICK_THRESHOLD: f64 = 3.0;

/// Width of a new text box, in page units.
const NEW_TEXT_WIDTH: f64 = 120.0;

/// Size of a new sticky note, in page units.
const NEW_NOTE_SIZE: (f64, f64) = (160.0, 100.0);

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Note,
    Pen,
    Highlighter,
    Rectangle,
    Circle,
    Arrow,
}

impl ToolKind {
    /// The ink tool for freehand kinds.
    pub fn ink_tool(self) -> Option<InkTool> {
        match self {
            ToolKind::Pen => Some(InkTool::Pen),
            ToolKind::Highlighter => Some(InkTool::Highlighter),
            _ => None,
        }
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Waiting for a pointer down.
    #[default]
    Idle,
    /// A gesture is in progress.
    Active {
        page_index: usize,
        viewport: Viewport,
        /// Device-space start point.
        start: Point,
        /// Device-space current point.
        current: Point,
    },
}

/// Manages the current tool and its gesture.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    state: ToolState,
    capture: FreehandCapture,
    /// Stroke color for shapes, arrows and pen strokes.
    pub stroke_color: SerializableColor,
    /// Fill color for new rectangles and circles.
    pub fill_color: Option<SerializableColor>,
    /// Background of new notes.
    pub note_color: SerializableColor,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            capture: FreehandCapture::new(),
            stroke_color: SerializableColor::black(),
            fill_color: None,
            note_color: SerializableColor::new(255, 240, 150, 255),
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.cancel();
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    pub fn capture(&self) -> &FreehandCapture {
        &self.capture
    }

    /// Pointer down on a page.
    pub fn begin(
        &mut self,
        page_index: usize,
        point: Point,
        viewport: Viewport,
        config: &SessionConfig,
    ) {
        if let Some(ink) = self.current_tool.ink_tool() {
            self.capture.set_pen_color(self.stroke_color);
            self.capture
                .pointer_down(page_index, point, ink, viewport, config);
        }
        self.state = ToolState::Active {
            page_index,
            viewport,
            start: point,
            current: point,
        };
    }

    /// Pointer moved during a gesture.
    pub fn update(&mut self, point: Point, sink: &mut dyn InkSink) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
            if self.current_tool.ink_tool().is_some() {
                self.capture.pointer_move(point, sink);
            }
        }
    }

    /// Pointer released: create the element the gesture describes, if any.
    ///
    /// A new text element enters edit mode immediately.
    pub fn end(
        &mut self,
        point: Point,
        store: &mut ElementStore,
        config: &SessionConfig,
    ) -> EditResult<Option<ElementId>> {
        let ToolState::Active {
            page_index,
            viewport,
            start,
            ..
        } = std::mem::take(&mut self.state)
        else {
            return Ok(None);
        };

        if self.current_tool.ink_tool().is_some() {
            return self.capture.pointer_up(store);
        }

        let is_click = start.distance(point) < CLICK_THRESHOLD;
        let page_start = viewport.to_page(start);
        let page_end = viewport.to_page(point);
        let stroke_width = viewport.length_to_page(config.pen_width);

        let element = match self.current_tool {
            ToolKind::Select | ToolKind::Pen | ToolKind::Highlighter => None,
            ToolKind::Text if is_click => {
                let mut text = TextPayload::new("", config.default_font_size);
                text.color = self.stroke_color;
                let bounds = Rect::new(
                    page_start.x,
                    page_start.y - config.default_font_size,
                    page_start.x + NEW_TEXT_WIDTH,
                    page_start.y,
                );
                Some(EditableElement::new(page_index, bounds, ElementPayload::Text(text)))
            }
            ToolKind::Note if is_click => {
                let (w, h) = NEW_NOTE_SIZE;
                let bounds = Rect::new(page_start.x, page_start.y - h, page_start.x + w, page_start.y);
                let note = NotePayload {
                    text: String::new(),
                    color: self.note_color,
                };
                Some(EditableElement::new(page_index, bounds, ElementPayload::Note(note)))
            }
            ToolKind::Text | ToolKind::Note => None,
            ToolKind::Rectangle | ToolKind::Circle => {
                let bounds = Rect::from_points(page_start, page_end);
                if is_click || bounds.area() <= f64::EPSILON {
                    None
                } else {
                    let shape = ShapePayload {
                        stroke_color: self.stroke_color,
                        stroke_width,
                        fill_color: self.fill_color,
                    };
                    let payload = if self.current_tool == ToolKind::Rectangle {
                        ElementPayload::Rectangle(shape)
                    } else {
                        ElementPayload::Circle(shape)
                    };
                    Some(EditableElement::new(page_index, bounds, payload))
                }
            }
            ToolKind::Arrow if is_click => None,
            ToolKind::Arrow => {
                let arrow = ArrowPayload {
                    start: page_start,
                    end: page_end,
                    stroke_color: self.stroke_color,
                    stroke_width,
                };
                Some(EditableElement::new(page_index, Rect::ZERO, ElementPayload::Arrow(arrow)))
            }
        };

        let Some(element) = element else {
            return Ok(None);
        };
        let is_text = matches!(element.payload, ElementPayload::Text(_));
        let id = store.add(element)?;
        if is_text {
            store.start_edit(id)?;
        }
        Ok(Some(id))
    }

    /// Abandon the gesture in progress.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.capture.cancel();
    }
}
