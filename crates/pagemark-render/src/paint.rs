//! Conversion of elements into device-space draw commands.

use crate::layers::DrawOp;
use kurbo::{BezPath, Ellipse, Point, Shape as _, Vec2};
use pagemark_core::element::{ArrowPayload, InkTool, SerializableColor};
use pagemark_core::{Brush, EditableElement, ElementPayload, Viewport};

/// Arrowhead length in page units.
const ARROW_HEAD_SIZE: f64 = 12.0;

fn pen(color: SerializableColor, width: f64) -> Brush {
    Brush {
        tool: InkTool::Pen,
        color,
        width,
    }
}

/// Draw commands for the ink layer, or nothing for element kinds that the
/// host paints itself (text, images, signatures, notes).
pub fn ink_ops(element: &EditableElement, viewport: &Viewport) -> Vec<DrawOp> {
    match &element.payload {
        ElementPayload::Drawing(drawing) => {
            let Some((first, rest)) = drawing.path.split_first() else {
                return Vec::new();
            };
            let mut path = BezPath::new();
            path.move_to(viewport.to_device(*first));
            for point in rest {
                path.line_to(viewport.to_device(*point));
            }
            vec![DrawOp::StrokePath {
                path,
                brush: Brush {
                    tool: drawing.tool,
                    color: drawing.stroke_color,
                    width: viewport.length_to_device(drawing.stroke_width),
                },
            }]
        }
        ElementPayload::Rectangle(shape) => {
            let rect = element.device_bounds(viewport);
            let mut ops = Vec::with_capacity(2);
            if let Some(fill) = shape.fill_color {
                ops.push(DrawOp::FillRect { rect, color: fill });
            }
            ops.push(DrawOp::StrokeRect {
                rect,
                color: shape.stroke_color,
                width: viewport.length_to_device(shape.stroke_width),
            });
            ops
        }
        ElementPayload::Circle(shape) => {
            let path = Ellipse::from_rect(element.device_bounds(viewport)).to_path(0.1);
            let mut ops = Vec::with_capacity(2);
            if let Some(fill) = shape.fill_color {
                ops.push(DrawOp::FillPath {
                    path: path.clone(),
                    color: fill,
                });
            }
            ops.push(DrawOp::StrokePath {
                path,
                brush: pen(
                    shape.stroke_color,
                    viewport.length_to_device(shape.stroke_width),
                ),
            });
            ops
        }
        ElementPayload::Arrow(arrow) => vec![DrawOp::StrokePath {
            path: arrow_path(arrow, viewport),
            brush: pen(
                arrow.stroke_color,
                viewport.length_to_device(arrow.stroke_width),
            ),
        }],
        ElementPayload::Text(_)
        | ElementPayload::Image(_)
        | ElementPayload::Signature(_)
        | ElementPayload::Note(_) => Vec::new(),
    }
}

/// Shaft plus an open arrowhead at `end`, in device space.
fn arrow_path(arrow: &ArrowPayload, viewport: &Viewport) -> BezPath {
    let start = viewport.to_device(arrow.start);
    let end = viewport.to_device(arrow.end);
    let mut path = BezPath::new();
    path.move_to(start);
    path.line_to(end);

    let shaft = end - start;
    let length = shaft.hypot();
    if length < f64::EPSILON {
        return path;
    }
    let dir = shaft / length;
    let perp = Vec2::new(-dir.y, dir.x);
    let head = viewport.length_to_device(ARROW_HEAD_SIZE).min(length);
    let back: Point = end - dir * head;

    path.move_to(back + perp * head * 0.5);
    path.line_to(end);
    path.line_to(back - perp * head * 0.5);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use pagemark_core::element::{DrawingPayload, ShapePayload, TextPayload};

    fn viewport() -> Viewport {
        Viewport::new(200.0, 100.0, 2.0)
    }

    #[test]
    fn test_drawing_scaled_to_device() {
        let drawing = EditableElement::new(
            0,
            Rect::ZERO,
            ElementPayload::Drawing(DrawingPayload {
                path: vec![Point::new(0.0, 100.0), Point::new(10.0, 90.0)],
                stroke_color: SerializableColor::black(),
                stroke_width: 1.5,
                tool: InkTool::Highlighter,
            }),
        );
        let ops = ink_ops(&drawing, &viewport());
        let [DrawOp::StrokePath { path, brush }] = ops.as_slice() else {
            panic!("expected one stroke, got {ops:?}");
        };
        assert_eq!(brush.width, 3.0);
        assert_eq!(brush.tool, InkTool::Highlighter);
        let bbox = path.bounding_box();
        assert_eq!(bbox, Rect::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_filled_rectangle_fills_then_strokes() {
        let rect = EditableElement::new(
            0,
            Rect::new(10.0, 10.0, 20.0, 30.0),
            ElementPayload::Rectangle(ShapePayload {
                fill_color: Some(SerializableColor::highlight()),
                ..ShapePayload::default()
            }),
        );
        let ops = ink_ops(&rect, &viewport());
        assert!(matches!(
            ops.as_slice(),
            [DrawOp::FillRect { .. }, DrawOp::StrokeRect { .. }]
        ));
    }

    #[test]
    fn test_filled_circle_fills_then_strokes() {
        let mut circle = EditableElement::new(
            0,
            Rect::new(10.0, 10.0, 30.0, 30.0),
            ElementPayload::Circle(ShapePayload {
                fill_color: Some(SerializableColor::highlight()),
                ..ShapePayload::default()
            }),
        );
        let ops = ink_ops(&circle, &viewport());
        let [DrawOp::FillPath { path, color }, DrawOp::StrokePath { .. }] = ops.as_slice() else {
            panic!("expected fill then stroke, got {ops:?}");
        };
        assert_eq!(*color, SerializableColor::highlight());
        let bbox = path.bounding_box();
        assert!((bbox.width() - 40.0).abs() < 1e-6);

        if let ElementPayload::Circle(shape) = &mut circle.payload {
            shape.fill_color = None;
        }
        let ops = ink_ops(&circle, &viewport());
        assert!(matches!(ops.as_slice(), [DrawOp::StrokePath { .. }]));
    }

    #[test]
    fn test_text_is_not_ink() {
        let text = EditableElement::new(
            0,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            ElementPayload::Text(TextPayload::new("hi", 10.0)),
        );
        assert!(ink_ops(&text, &viewport()).is_empty());
    }

    #[test]
    fn test_degenerate_arrow_has_no_head() {
        let arrow = ArrowPayload {
            start: Point::new(5.0, 5.0),
            end: Point::new(5.0, 5.0),
            stroke_color: SerializableColor::black(),
            stroke_width: 1.0,
        };
        assert_eq!(arrow_path(&arrow, &viewport()).elements().len(), 2);
    }
}
