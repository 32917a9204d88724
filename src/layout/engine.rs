//! Paginated block layout
//!
//! Line breaking uses a fixed average glyph width of `0.56 × font size`.
//! Layout drives reflow and virtualization rather than typography, so the
//! estimate only needs to be stable, not exact.

use crate::ast::{BlockNode, DocumentAst};

use super::types::{LayoutBlock, LayoutBlockKind, LayoutDocument, LayoutLine, LayoutOptions};

pub const GLYPH_WIDTH_FACTOR: f64 = 0.56;
pub const TEXT_COLOR: &str = "#0f172a";

const MIN_CHARS_PER_LINE: usize = 20;
const MIN_HEADING_FONT: f64 = 18.0;
const BLOCK_PADDING: f64 = 10.0;
const HEADING_GAP: f64 = 12.0;
const BLOCK_GAP: f64 = 8.0;

/// Greedy word wrap. Words longer than `max_chars` get a line of their own;
/// empty input yields one empty line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Characters per line for `font_size` within `content_width`
pub fn chars_per_line(content_width: f64, font_size: f64) -> usize {
    let estimate = (content_width / (font_size * GLYPH_WIDTH_FACTOR)).floor();
    if estimate.is_finite() && estimate > 0.0 {
        (estimate as usize).max(MIN_CHARS_PER_LINE)
    } else {
        MIN_CHARS_PER_LINE
    }
}

fn heading_font(base: f64, level: u8) -> f64 {
    MIN_HEADING_FONT.max(base + (7.0 - f64::from(level)) * 1.2)
}

fn kind_of(node: &BlockNode) -> LayoutBlockKind {
    match node {
        BlockNode::Paragraph(_) => LayoutBlockKind::Paragraph,
        BlockNode::Heading(_) => LayoutBlockKind::Heading,
        BlockNode::Table(_) => LayoutBlockKind::Table,
        BlockNode::Image(_) => LayoutBlockKind::Image,
        BlockNode::CodeBlock(_) => LayoutBlockKind::Code,
    }
}

/// Lay out every content-bearing block of `ast` in document order.
///
/// A block that would cross the bottom margin of its page moves to the top
/// of the next page. A block taller than a page stays where it starts and
/// overflows; the block after it resumes on the first page it has not
/// covered.
pub fn build_layout(ast: &DocumentAst, options: &LayoutOptions) -> LayoutDocument {
    let page_height = options.page_height;
    let margin = options.margin;
    let content_width = options.content_width();

    let mut blocks = Vec::with_capacity(ast.content_bearing_count());
    let mut page_index: u32 = 0;
    let mut y = margin;

    for node in ast.blocks().filter(|node| node.is_content_bearing()) {
        let kind = kind_of(node);
        let text = node.plain_text();
        let font_size = match node {
            BlockNode::Heading(heading) => heading_font(options.base_font_size, heading.level),
            _ => options.base_font_size,
        };

        let wrapped = match node {
            BlockNode::CodeBlock(code) => code.text.split('\n').map(str::to_string).collect(),
            _ => wrap_text(&text, chars_per_line(content_width, font_size)),
        };

        let line_px = font_size * options.line_height;
        let height = line_px.max(wrapped.len() as f64 * line_px + BLOCK_PADDING);

        // an oversized predecessor may have run past several pages
        while page_height > 0.0 && y >= f64::from(page_index + 1) * page_height {
            page_index += 1;
        }

        let page_top = f64::from(page_index) * page_height + margin;
        if y + height + margin > f64::from(page_index + 1) * page_height && y > page_top {
            page_index += 1;
            y = f64::from(page_index) * page_height + margin;
        }

        blocks.push(LayoutBlock {
            id: format!("layout-{}", node.id()),
            node_id: node.id().to_string(),
            kind,
            page_index,
            x: margin,
            y,
            width: content_width,
            height,
            font_size,
            line_height: options.line_height,
            font_weight: if kind == LayoutBlockKind::Heading { 700 } else { 400 },
            color: TEXT_COLOR.to_string(),
            lines: wrapped
                .into_iter()
                .enumerate()
                .map(|(index, text)| LayoutLine {
                    text,
                    y_offset: index as f64 * line_px,
                })
                .collect(),
            searchable_text: text,
        });

        y += height
            + if kind == LayoutBlockKind::Heading {
                HEADING_GAP
            } else {
                BLOCK_GAP
            };
    }

    let page_count = page_index + 1;
    let last_extent = blocks.last().map_or(margin, LayoutBlock::bottom);

    LayoutDocument {
        blocks,
        total_height: (f64::from(page_count) * page_height).max(last_extent + margin),
        page_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, create_empty_document_ast, DocumentFormat};

    fn document(blocks: Vec<BlockNode>) -> DocumentAst {
        let mut doc = create_empty_document_ast("t.txt", 0, "text/plain", DocumentFormat::Txt, vec![]);
        doc.sections = vec![ast::section(Some("Body"), blocks)];
        doc
    }

    #[test]
    fn test_wrap_text_greedy() {
        assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap_text("  ", 5), vec![""]);
        assert_eq!(wrap_text("abcdefgh ij", 4), vec!["abcdefgh", "ij"]);
        assert_eq!(wrap_text("é é é", 3), vec!["é é", "é"]);
    }

    #[test]
    fn test_chars_per_line_floor() {
        // 804 / (16 * 0.56) = 89.7
        assert_eq!(chars_per_line(804.0, 16.0), 89);
        assert_eq!(chars_per_line(10.0, 16.0), 20);
        assert_eq!(chars_per_line(0.0, 16.0), 20);
    }

    #[test]
    fn test_block_geometry() {
        let doc = document(vec![ast::heading("Title", 1), ast::paragraph("Hello world")]);
        let layout = build_layout(&doc, &LayoutOptions::new(1200.0));

        assert_eq!(layout.blocks.len(), 2);
        let heading = &layout.blocks[0];
        assert_eq!(heading.kind, LayoutBlockKind::Heading);
        assert!((heading.font_size - 23.2).abs() < 1e-9);
        assert_eq!(heading.font_weight, 700);
        assert_eq!(heading.x, 48.0);
        assert_eq!(heading.y, 48.0);
        assert_eq!(heading.width, 1200.0 - 96.0);
        assert_eq!(heading.id, format!("layout-{}", heading.node_id));

        let paragraph = &layout.blocks[1];
        let line_px = 16.0 * 1.6;
        assert!((paragraph.height - (line_px + 10.0)).abs() < 1e-9);
        assert!((paragraph.y - (48.0 + heading.height + 12.0)).abs() < 1e-9);
        assert_eq!(paragraph.font_weight, 400);
        assert_eq!(paragraph.color, TEXT_COLOR);
        assert_eq!(paragraph.searchable_text, "Hello world");

        assert_eq!(layout.page_count, 1);
        assert_eq!(layout.total_height, 1200.0);
    }

    #[test]
    fn test_page_width_floor_and_heading_font_floor() {
        let options = LayoutOptions::new(300.0);
        assert_eq!(options.effective_page_width(), 900.0);
        assert_eq!(heading_font(16.0, 6), 18.0);
        assert!((heading_font(16.0, 3) - 20.8).abs() < 1e-9);
    }

    #[test]
    fn test_code_blocks_split_on_newlines_only() {
        let doc = document(vec![ast::code_block(
            "let a = 1;\n\nlet b = a + 1; // a long comment that would otherwise wrap across lines",
            Some("rust"),
        )]);
        let layout = build_layout(&doc, &LayoutOptions::new(900.0));
        let block = &layout.blocks[0];
        assert_eq!(block.kind, LayoutBlockKind::Code);
        assert_eq!(block.lines.len(), 3);
        assert_eq!(block.lines[1].text, "");
        assert!((block.lines[2].y_offset - 2.0 * 25.6).abs() < 1e-9);
    }

    #[test]
    fn test_tables_and_images_flatten() {
        let doc = document(vec![
            ast::table(vec![vec!["a", "b"], vec!["1", "2"]]),
            ast::image(Some("A chart".into()), None),
        ]);
        let layout = build_layout(&doc, &LayoutOptions::new(900.0));
        assert_eq!(layout.blocks[0].searchable_text, "a | b\n1 | 2");
        assert_eq!(layout.blocks[0].kind, LayoutBlockKind::Table);
        assert_eq!(layout.blocks[1].searchable_text, "A chart");
        assert_eq!(layout.blocks[1].kind, LayoutBlockKind::Image);
    }

    #[test]
    fn test_block_count_matches_content_bearing_nodes() {
        let doc = document(vec![
            ast::paragraph("one"),
            ast::paragraph("   "),
            ast::image(None, None),
            ast::heading("two", 2),
            ast::code_block("", None),
        ]);
        let layout = build_layout(&doc, &LayoutOptions::new(900.0));
        assert_eq!(layout.blocks.len(), doc.content_bearing_count());
        assert_eq!(layout.blocks.len(), 2);
    }

    #[test]
    fn test_pagination_never_crosses_page_bottom() {
        let paragraphs = (0..200)
            .map(|i| ast::paragraph(format!("Paragraph number {i} with a little text")))
            .collect();
        let doc = document(paragraphs);
        let options = LayoutOptions::new(900.0);
        let layout = build_layout(&doc, &options);

        assert!(layout.page_count > 1);
        let mut previous = (0u32, f64::MIN);
        for block in &layout.blocks {
            assert!((block.page_index, block.y) >= previous);
            previous = (block.page_index, block.y);
            let page_bottom = f64::from(block.page_index + 1) * options.page_height;
            assert!(block.bottom() + options.margin <= page_bottom);
        }
        assert_eq!(layout.blocks.last().map(|b| b.page_index + 1), Some(layout.page_count));
        assert!(layout.total_height >= f64::from(layout.page_count) * options.page_height);
    }

    #[test]
    fn test_oversized_block_does_not_pull_successor_back() {
        let long_code = (0..120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let doc = document(vec![ast::code_block(long_code, None), ast::paragraph("after")]);
        let options = LayoutOptions::new(900.0);
        let layout = build_layout(&doc, &options);

        let big = &layout.blocks[0];
        let after = &layout.blocks[1];
        assert_eq!(big.page_index, 0);
        assert!(big.bottom() > options.page_height);
        assert!(after.y >= big.bottom());
        assert!(after.page_index >= 2);
        assert!(layout.total_height >= after.bottom() + options.margin);
    }

    #[test]
    fn test_empty_document() {
        let doc = document(vec![]);
        let layout = build_layout(&doc, &LayoutOptions::new(900.0));
        assert!(layout.blocks.is_empty());
        assert_eq!(layout.page_count, 1);
        assert_eq!(layout.total_height, 1200.0);
    }
}
