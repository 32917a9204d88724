//! Paints visible layout blocks and annotations onto a [`DrawSurface`]
//!
//! Rendering is stateless: each call resizes and clears the surface, then
//! repaints everything it is given.

use crate::annotations::{Annotation, AnnotationBody, Point, Rect};
use crate::annotations::engine::{DEFAULT_HIGHLIGHT_COLOR, DEFAULT_PEN_COLOR};
use crate::layout::{LayoutBlock, LayoutBlockKind, TEXT_COLOR};

use super::surface::{Color, DrawSurface, Font};

const CODE_PANEL_COLOR: Color = Color::rgb(0xf1, 0xf5, 0xf9);
const COMMENT_MARKER_COLOR: Color = Color::rgb(0xf5, 0x9e, 0x0b);
const COMMENT_TEXT_COLOR: Color = Color::rgb(0x11, 0x18, 0x27);
const COMMENT_MARKER_RADIUS: f64 = 6.0;
const COMMENT_PREVIEW_CHARS: usize = 32;
const COMMENT_FONT_SIZE: f64 = 11.0;
const MIN_FONT_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub zoom: f64,
    /// CSS color painted under everything; transparent when unset
    pub background_color: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            background_color: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderParams<'a> {
    pub visible_blocks: &'a [LayoutBlock],
    pub annotations: &'a [Annotation],
    pub total_height: f64,
    pub width: f64,
    pub options: RenderOptions,
}

fn color_or(css: &str, fallback: Color) -> Color {
    Color::parse(css).unwrap_or_else(|| {
        tracing::debug!(color = %css, "Unparseable color, using fallback");
        fallback
    })
}

fn draw_block(surface: &mut dyn DrawSurface, block: &LayoutBlock, zoom: f64, text_color: Color) {
    let x = block.x * zoom;
    let y = block.y * zoom;

    if block.kind == LayoutBlockKind::Code {
        surface.fill_rect(
            Rect::new(x - 8.0, y - 6.0, block.width * zoom + 16.0, block.height * zoom + 12.0),
            CODE_PANEL_COLOR,
        );
    }

    let font = Font {
        size: MIN_FONT_SIZE.max(block.font_size * zoom),
        weight: block.font_weight,
    };
    let color = color_or(&block.color, text_color);

    for line in &block.lines {
        surface.fill_text(&line.text, Point::new(x, y + line.y_offset * zoom), font, color);
    }
}

fn draw_annotation(surface: &mut dyn DrawSurface, annotation: &Annotation, zoom: f64) {
    match &annotation.body {
        AnnotationBody::Highlight { color, rects, .. } => {
            let fallback = color_or(DEFAULT_HIGHLIGHT_COLOR, Color::TRANSPARENT);
            let fill = color_or(color, fallback);
            for rect in rects {
                surface.fill_rect(rect.scaled(zoom), fill);
            }
        }
        AnnotationBody::Pen {
            color,
            stroke_width,
            points,
        } => {
            if points.len() < 2 {
                return;
            }
            let stroke = color_or(color, color_or(DEFAULT_PEN_COLOR, Color::BLACK));
            let scaled: Vec<Point> = points.iter().map(|p| Point::new(p.x * zoom, p.y * zoom)).collect();
            surface.stroke_path(&scaled, (stroke_width * zoom).max(1.0), stroke);
        }
        AnnotationBody::Comment { text, position, .. } => {
            let x = position.x * zoom;
            let y = position.y * zoom;
            surface.fill_circle(Point::new(x, y), COMMENT_MARKER_RADIUS, COMMENT_MARKER_COLOR);

            let preview: String = text.chars().take(COMMENT_PREVIEW_CHARS).collect();
            let font = Font {
                size: MIN_FONT_SIZE.max(COMMENT_FONT_SIZE * zoom),
                weight: 400,
            };
            surface.fill_text(&preview, Point::new(x + 10.0, y - 8.0), font, COMMENT_TEXT_COLOR);
        }
    }
}

/// Size, clear and paint the surface for one frame
pub fn render_document(surface: &mut dyn DrawSurface, params: &RenderParams<'_>) {
    let zoom = if params.options.zoom.is_finite() && params.options.zoom > 0.0 {
        params.options.zoom
    } else {
        1.0
    };

    let pixel_ratio = surface.device_pixel_ratio().max(1.0);
    let css_width = params.width.max(0.0).floor() as u32;
    let css_height = ((params.total_height * zoom).floor() as u32).max(1);

    surface.resize(css_width, css_height, pixel_ratio);
    surface.clear();

    if let Some(background) = params.options.background_color.as_deref() {
        match Color::parse(background) {
            Some(color) => surface.fill_rect(
                Rect::new(0.0, 0.0, f64::from(css_width), f64::from(css_height)),
                color,
            ),
            None => tracing::warn!(color = %background, "Ignoring unparseable background color"),
        }
    }

    let text_color = color_or(TEXT_COLOR, Color::BLACK);
    for block in params.visible_blocks {
        draw_block(surface, block, zoom, text_color);
    }

    for annotation in params.annotations {
        draw_annotation(surface, annotation, zoom);
    }

    tracing::trace!(
        blocks = params.visible_blocks.len(),
        annotations = params.annotations.len(),
        zoom,
        "Frame rendered"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{create_comment, create_highlight, create_pen};
    use crate::ast::{self, create_empty_document_ast, DocumentFormat};
    use crate::layout::{build_layout, LayoutDocument, LayoutOptions};
    use crate::render::recording::{DrawCommand, RecordingSurface};

    fn sample_layout() -> LayoutDocument {
        let mut doc = create_empty_document_ast("r.md", 0, "text/markdown", DocumentFormat::Md, vec![]);
        doc.sections = vec![ast::section(
            None,
            vec![
                ast::heading("Title", 1),
                ast::paragraph("Body text"),
                ast::code_block("let x = 1;", Some("rust")),
            ],
        )];
        build_layout(&doc, &LayoutOptions::new(900.0))
    }

    fn render(layout: &LayoutDocument, annotations: &[Annotation], options: RenderOptions, ratio: f64) -> Vec<DrawCommand> {
        let mut surface = RecordingSurface::with_pixel_ratio(ratio);
        render_document(
            &mut surface,
            &RenderParams {
                visible_blocks: &layout.blocks,
                annotations,
                total_height: layout.total_height,
                width: 900.7,
                options,
            },
        );
        surface.take_commands()
    }

    #[test]
    fn test_sizing_clear_and_background() {
        let layout = sample_layout();
        let commands = render(
            &layout,
            &[],
            RenderOptions {
                zoom: 1.5,
                background_color: Some("#ffffff".into()),
            },
            2.0,
        );

        assert_eq!(
            commands[0],
            DrawCommand::Resize {
                css_width: 900,
                css_height: 1800,
                pixel_ratio: 2.0
            }
        );
        assert_eq!(commands[1], DrawCommand::Clear);
        assert_eq!(
            commands[2],
            DrawCommand::FillRect {
                rect: Rect::new(0.0, 0.0, 900.0, 1800.0),
                color: Color::WHITE
            }
        );
    }

    #[test]
    fn test_blocks_paint_text_and_code_panel() {
        let layout = sample_layout();
        let commands = render(&layout, &[], RenderOptions::default(), 1.0);

        let texts: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Title", "Body text", "let x = 1;"]);

        let code = &layout.blocks[2];
        assert!(commands.contains(&DrawCommand::FillRect {
            rect: Rect::new(code.x - 8.0, code.y - 6.0, code.width + 16.0, code.height + 12.0),
            color: CODE_PANEL_COLOR,
        }));
        // no background requested, so the heading text follows the clear
        assert!(matches!(commands[2], DrawCommand::FillText { .. }));
    }

    #[test]
    fn test_small_zoom_keeps_minimum_font() {
        let layout = sample_layout();
        let commands = render(&layout, &[], RenderOptions { zoom: 0.5, background_color: None }, 1.0);
        for command in &commands {
            if let DrawCommand::FillText { font, .. } = command {
                assert!(font.size >= MIN_FONT_SIZE);
            }
        }
    }

    #[test]
    fn test_annotations_paint_after_blocks() {
        let layout = sample_layout();
        let annotations = vec![
            create_highlight("doc", 0, vec![Rect::new(10.0, 10.0, 30.0, 20.0)], None),
            create_pen("doc", 0, vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]),
            create_pen("doc", 0, vec![Point::new(0.0, 0.0)]),
            create_comment("doc", 0, &"c".repeat(50), Point::new(100.0, 100.0)),
        ];
        let commands = render(&layout, &annotations, RenderOptions { zoom: 2.0, background_color: None }, 1.0);

        let tail = &commands[commands.len() - 4..];
        assert_eq!(
            tail[0],
            DrawCommand::FillRect {
                rect: Rect::new(20.0, 20.0, 60.0, 40.0),
                color: Color::rgba(251, 191, 36, 92),
            }
        );
        match &tail[1] {
            DrawCommand::StrokePath { points, width, color } => {
                assert_eq!(points[1], Point::new(20.0, 20.0));
                assert_eq!(*width, 4.0);
                assert_eq!(*color, Color::rgb(0x25, 0x63, 0xeb));
            }
            other => panic!("expected stroke, got {:?}", other),
        }
        assert_eq!(
            tail[2],
            DrawCommand::FillCircle {
                center: Point::new(200.0, 200.0),
                radius: 6.0,
                color: COMMENT_MARKER_COLOR
            }
        );
        match &tail[3] {
            DrawCommand::FillText { text, origin, font, .. } => {
                assert_eq!(text.chars().count(), 32);
                assert_eq!(*origin, Point::new(210.0, 192.0));
                assert_eq!(font.size, 22.0);
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let layout = sample_layout();
        let first = render(&layout, &[], RenderOptions::default(), 1.0);
        let second = render(&layout, &[], RenderOptions::default(), 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pixmap_frame() {
        use crate::render::pixmap::PixmapSurface;

        let layout = sample_layout();
        let mut surface = PixmapSurface::new().with_window(0.0, 300.0);
        render_document(
            &mut surface,
            &RenderParams {
                visible_blocks: &layout.blocks,
                annotations: &[],
                total_height: layout.total_height,
                width: 900.0,
                options: RenderOptions {
                    zoom: 1.0,
                    background_color: Some("#ffffff".into()),
                },
            },
        );
        assert_eq!(surface.css_size(), (900, 1200));
        assert_eq!(surface.dimensions(), (900, 300));
        assert_eq!(surface.pixel_at(2.0, 2.0).map(|p| p.0), Some([255, 255, 255, 255]));
    }
}
