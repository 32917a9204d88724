//! Pointer gestures → annotations

use chrono::Utc;
use uuid::Uuid;

use super::types::{Annotation, AnnotationBody, AnnotationTool, Point, Rect};

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "rgba(251,191,36,0.36)";
pub const DEFAULT_PEN_COLOR: &str = "#2563eb";
pub const DEFAULT_PEN_WIDTH: f64 = 2.0;
pub const MAX_COMMENT_CHARS: usize = 300;
pub const DEFAULT_COMMENT_TEXT: &str = "Comment";

/// Highlights stay at least this wide and tall so they remain clickable
pub const MIN_HIGHLIGHT_SIZE: f64 = 10.0;

fn new_annotation(tool: AnnotationTool, document_id: &str, page_index: u32, body: AnnotationBody) -> Annotation {
    let now = Utc::now();
    Annotation {
        id: format!("anno-{}-{}", tool.as_str(), Uuid::new_v4()),
        document_id: document_id.to_string(),
        page_index,
        created_at: now,
        updated_at: now,
        author_id: None,
        body,
    }
}

pub fn create_highlight(document_id: &str, page_index: u32, rects: Vec<Rect>, color: Option<&str>) -> Annotation {
    new_annotation(
        AnnotationTool::Highlight,
        document_id,
        page_index,
        AnnotationBody::Highlight {
            color: color.unwrap_or(DEFAULT_HIGHLIGHT_COLOR).to_string(),
            rects,
            node_ref_id: None,
        },
    )
}

pub fn create_pen(document_id: &str, page_index: u32, points: Vec<Point>) -> Annotation {
    new_annotation(
        AnnotationTool::Pen,
        document_id,
        page_index,
        AnnotationBody::Pen {
            color: DEFAULT_PEN_COLOR.to_string(),
            stroke_width: DEFAULT_PEN_WIDTH,
            points,
        },
    )
}

/// Comment anchored at `position`; text is trimmed and cut to 300 characters
pub fn create_comment(document_id: &str, page_index: u32, text: &str, position: Point) -> Annotation {
    new_annotation(
        AnnotationTool::Comment,
        document_id,
        page_index,
        AnnotationBody::Comment {
            text: text.trim().chars().take(MAX_COMMENT_CHARS).collect(),
            position,
            node_ref_id: None,
        },
    )
}

/// Smallest rectangle covering `points`, grown to the minimum highlight size
pub fn bounding_rect(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(Rect::new(
        min_x,
        min_y,
        (max_x - min_x).max(MIN_HIGHLIGHT_SIZE),
        (max_y - min_y).max(MIN_HIGHLIGHT_SIZE),
    ))
}

/// Turn a captured pointer path into an annotation for `tool`.
///
/// Pen and highlight need at least two points, comment at least one.
/// Anything else yields `None` and the caller ignores the gesture.
pub fn apply_pointer_tool(
    tool: AnnotationTool,
    document_id: &str,
    page_index: u32,
    points: &[Point],
    comment_text: Option<&str>,
) -> Option<Annotation> {
    match tool {
        AnnotationTool::Pen if points.len() > 1 => Some(create_pen(document_id, page_index, points.to_vec())),
        AnnotationTool::Highlight if points.len() > 1 => {
            let rect = bounding_rect(points)?;
            Some(create_highlight(document_id, page_index, vec![rect], None))
        }
        AnnotationTool::Comment => {
            let anchor = *points.first()?;
            let text = comment_text
                .filter(|text| !text.is_empty())
                .unwrap_or(DEFAULT_COMMENT_TEXT);
            Some(create_comment(document_id, page_index, text, anchor))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_highlight_bounding_rect() {
        let annotation = apply_pointer_tool(
            AnnotationTool::Highlight,
            "doc",
            0,
            &points(&[(10.0, 10.0), (40.0, 30.0)]),
            None,
        )
        .unwrap();

        assert!(annotation.id.starts_with("anno-highlight-"));
        match annotation.body {
            AnnotationBody::Highlight { color, rects, .. } => {
                assert_eq!(color, DEFAULT_HIGHLIGHT_COLOR);
                assert_eq!(rects, vec![Rect::new(10.0, 10.0, 30.0, 20.0)]);
            }
            other => panic!("expected highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_highlight_minimum_size() {
        let rect = bounding_rect(&points(&[(5.0, 5.0), (7.0, 6.0)])).unwrap();
        assert_eq!(rect, Rect::new(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn test_pen_keeps_points_and_needs_two() {
        assert!(apply_pointer_tool(AnnotationTool::Pen, "doc", 0, &points(&[(1.0, 1.0)]), None).is_none());

        let path = points(&[(1.0, 1.0), (2.0, 3.0), (4.0, 4.0)]);
        let annotation = apply_pointer_tool(AnnotationTool::Pen, "doc", 3, &path, None).unwrap();
        assert_eq!(annotation.page_index, 3);
        match annotation.body {
            AnnotationBody::Pen {
                color,
                stroke_width,
                points: stored,
            } => {
                assert_eq!(color, DEFAULT_PEN_COLOR);
                assert_eq!(stroke_width, 2.0);
                assert_eq!(stored, path);
            }
            other => panic!("expected pen, got {:?}", other),
        }
    }

    #[test]
    fn test_comment_text_rules() {
        let anchor = points(&[(3.0, 4.0), (9.0, 9.0)]);

        let default = apply_pointer_tool(AnnotationTool::Comment, "doc", 0, &anchor, None).unwrap();
        let empty = apply_pointer_tool(AnnotationTool::Comment, "doc", 0, &anchor, Some("")).unwrap();
        let long = "x".repeat(400);
        let truncated =
            apply_pointer_tool(AnnotationTool::Comment, "doc", 0, &anchor, Some(&format!("  {long}  "))).unwrap();

        for (annotation, expected_len) in [(default, 7), (empty, 7), (truncated, 300)] {
            match annotation.body {
                AnnotationBody::Comment { text, position, .. } => {
                    assert_eq!(text.chars().count(), expected_len);
                    assert_eq!(position, Point::new(3.0, 4.0));
                }
                other => panic!("expected comment, got {:?}", other),
            }
        }

        assert!(apply_pointer_tool(AnnotationTool::Comment, "doc", 0, &[], Some("hi")).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let path = points(&[(0.0, 0.0), (1.0, 1.0)]);
        let a = apply_pointer_tool(AnnotationTool::Pen, "doc", 0, &path, None).unwrap();
        let b = apply_pointer_tool(AnnotationTool::Pen, "doc", 0, &path, None).unwrap();
        assert_ne!(a.id, b.id);
    }
}
