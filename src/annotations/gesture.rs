//! Pointer gesture capture
//!
//! Pointer positions arrive in surface pixels. They are stored in document
//! coordinates (divided by zoom) so annotations stay anchored when the zoom
//! changes.

use super::engine::apply_pointer_tool;
use super::types::{Annotation, AnnotationTool, Point};

#[derive(Debug, Clone)]
pub struct GestureRecorder {
    tool: AnnotationTool,
    zoom: f64,
    page_height: f64,
    points: Vec<Point>,
    active: bool,
}

impl GestureRecorder {
    pub fn new(tool: AnnotationTool, zoom: f64, page_height: f64) -> Self {
        Self {
            tool,
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
            page_height,
            points: Vec::new(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn to_document(&self, surface: Point) -> Point {
        Point::new(surface.x / self.zoom, surface.y / self.zoom)
    }

    /// Start a new gesture, discarding any unfinished one
    pub fn pointer_down(&mut self, surface: Point) {
        self.points.clear();
        self.points.push(self.to_document(surface));
        self.active = true;
    }

    pub fn pointer_move(&mut self, surface: Point) {
        if self.active {
            let point = self.to_document(surface);
            self.points.push(point);
        }
    }

    /// Finish the gesture. The page comes from the first point.
    pub fn pointer_up(&mut self, document_id: &str, comment_text: Option<&str>) -> Option<Annotation> {
        if !self.active {
            return None;
        }
        self.active = false;

        let points = std::mem::take(&mut self.points);
        let page_index = points.first().map_or(0, |first| self.page_of(first.y));
        apply_pointer_tool(self.tool, document_id, page_index, &points, comment_text)
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.points.clear();
    }

    fn page_of(&self, y: f64) -> u32 {
        if self.page_height <= 0.0 || y <= 0.0 {
            return 0;
        }
        (y / self.page_height).floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::types::{AnnotationBody, Rect};

    #[test]
    fn test_zoomed_highlight_maps_to_document_space() {
        let mut recorder = GestureRecorder::new(AnnotationTool::Highlight, 2.0, 1200.0);
        recorder.pointer_down(Point::new(20.0, 2420.0));
        recorder.pointer_move(Point::new(50.0, 2440.0));
        recorder.pointer_move(Point::new(80.0, 2460.0));

        let annotation = recorder.pointer_up("doc", None).unwrap();
        assert_eq!(annotation.page_index, 1);
        match annotation.body {
            AnnotationBody::Highlight { rects, .. } => {
                assert_eq!(rects, vec![Rect::new(10.0, 1210.0, 30.0, 20.0)]);
            }
            other => panic!("expected highlight, got {:?}", other),
        }
        assert!(!recorder.is_active());
        assert!(recorder.points().is_empty());
    }

    #[test]
    fn test_moves_without_down_are_ignored() {
        let mut recorder = GestureRecorder::new(AnnotationTool::Pen, 1.0, 1200.0);
        recorder.pointer_move(Point::new(1.0, 1.0));
        assert!(recorder.points().is_empty());
        assert!(recorder.pointer_up("doc", None).is_none());
    }

    #[test]
    fn test_single_point_pen_yields_nothing() {
        let mut recorder = GestureRecorder::new(AnnotationTool::Pen, 1.0, 1200.0);
        recorder.pointer_down(Point::new(1.0, 1.0));
        assert!(recorder.pointer_up("doc", None).is_none());
    }

    #[test]
    fn test_comment_on_tap() {
        let mut recorder = GestureRecorder::new(AnnotationTool::Comment, 1.0, 1200.0);
        recorder.pointer_down(Point::new(5.0, 6.0));
        let annotation = recorder.pointer_up("doc", Some("Check this")).unwrap();
        match annotation.body {
            AnnotationBody::Comment { text, position, .. } => {
                assert_eq!(text, "Check this");
                assert_eq!(position, Point::new(5.0, 6.0));
            }
            other => panic!("expected comment, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_discards_points() {
        let mut recorder = GestureRecorder::new(AnnotationTool::Pen, 1.0, 1200.0);
        recorder.pointer_down(Point::new(1.0, 1.0));
        recorder.pointer_move(Point::new(2.0, 2.0));
        recorder.cancel();
        assert!(recorder.pointer_up("doc", None).is_none());
    }
}
