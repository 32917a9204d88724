//! Markdown parser
//!
//! A line-oriented state machine covering the subset readers care about:
//! ATX headings, fenced code blocks, pipe tables and paragraphs. Inline
//! markup is kept as literal text.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{self, BlockNode, DocumentFormat};

use super::sanitize::sanitize_text;
use super::{
    parsing_percent, Assembly, ParseContext, ParseError, ParsedDocument, ParserProgress,
    SourceFile, TextStats,
};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?\s*:?-{2,}").expect("valid table separator regex"));

const FENCE: &str = "```";

/// Blocks and warnings produced from Markdown source
#[derive(Debug)]
pub struct MarkdownOutput {
    pub blocks: Vec<BlockNode>,
    pub warnings: Vec<String>,
    pub stats: TextStats,
}

#[derive(Default)]
struct MarkdownState {
    blocks: Vec<BlockNode>,
    stats: TextStats,
    paragraph: Vec<String>,
    code: Vec<String>,
    code_language: Option<String>,
    in_code: bool,
}

impl MarkdownState {
    fn flush_paragraph(&mut self) {
        let text = self.paragraph.join(" ").trim().to_string();
        self.paragraph.clear();
        if text.is_empty() {
            return;
        }
        self.stats.record(&text);
        self.blocks.push(ast::paragraph(text));
    }

    fn flush_code(&mut self) {
        let code = self.code.join("\n").trim_end().to_string();
        self.code.clear();
        let language = self.code_language.take();
        if code.is_empty() {
            return;
        }
        self.stats.record(&code);
        self.blocks.push(ast::code_block(code, language.as_deref()));
    }

    fn push_heading(&mut self, level: u8, text: &str) {
        self.stats.record(text);
        self.blocks.push(ast::heading(text, level));
    }

    fn push_table(&mut self, rows: Vec<Vec<String>>) {
        if rows.is_empty() {
            return;
        }
        for cell in rows.iter().flatten() {
            self.stats.record(cell);
        }
        self.blocks.push(ast::table(rows));
    }
}

/// Split a pipe-table row into trimmed cells, dropping the empty edge
/// cells produced by leading and trailing pipes.
fn split_table_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|cell| cell.trim().to_string()).collect();
    if cells.len() > 1 && cells.first().is_some_and(|cell| cell.is_empty()) {
        cells.remove(0);
    }
    if cells.len() > 1
        && line.trim_end().ends_with('|')
        && cells.last().is_some_and(|cell| cell.is_empty())
    {
        cells.pop();
    }
    cells
}

/// Convert Markdown source into blocks. `on_line` receives the index of
/// each paragraph line and the total line count.
pub fn markdown_to_blocks(source: &str, mut on_line: impl FnMut(usize, usize)) -> MarkdownOutput {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut state = MarkdownState::default();
    let mut warnings = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        let trimmed = line.trim_end();

        if let Some(info) = trimmed.strip_prefix(FENCE) {
            if state.in_code {
                state.flush_code();
                state.in_code = false;
            } else {
                state.flush_paragraph();
                state.in_code = true;
                let language = info.trim();
                state.code_language = (!language.is_empty()).then(|| language.to_string());
            }
            index += 1;
            continue;
        }

        if state.in_code {
            state.code.push(line.to_string());
            index += 1;
            continue;
        }

        if trimmed.trim().is_empty() {
            state.flush_paragraph();
            index += 1;
            continue;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            state.flush_paragraph();
            let level = caps[1].len() as u8;
            state.push_heading(level, caps[2].trim());
            index += 1;
            continue;
        }

        let starts_table = trimmed.contains('|')
            && lines
                .get(index + 1)
                .is_some_and(|next| TABLE_SEPARATOR.is_match(next));
        if starts_table {
            state.flush_paragraph();
            let mut rows = vec![split_table_row(trimmed)];
            // skip the separator row
            index += 2;
            while let Some(row) = lines.get(index) {
                if !row.contains('|') || row.trim().is_empty() {
                    break;
                }
                rows.push(split_table_row(row));
                index += 1;
            }
            state.push_table(rows);
            continue;
        }

        state.paragraph.push(trimmed.trim().to_string());
        on_line(index, lines.len());
        index += 1;
    }

    state.flush_paragraph();
    if state.in_code {
        warnings.push(
            "Unclosed markdown code fence detected. Parsed remaining lines as code block.".to_string(),
        );
        state.flush_code();
    }

    MarkdownOutput {
        blocks: state.blocks,
        warnings,
        stats: state.stats,
    }
}

pub async fn parse_markdown(
    file: &SourceFile,
    context: &ParseContext,
) -> Result<ParsedDocument, ParseError> {
    let source = sanitize_text(&file.read_text().await?);

    let output = markdown_to_blocks(&source, |index, total| {
        let total = total.max(1) as u64;
        let index = index as u64;
        context.report(ParserProgress::parsing(
            parsing_percent(index, total),
            index * file.size / total,
            file.size,
            "Parsing markdown sections",
        ));
    });

    if !output.warnings.is_empty() {
        tracing::debug!(file = %file.name, warnings = ?output.warnings, "Markdown parsed with warnings");
    }

    Ok(Assembly {
        file,
        context,
        format: context.format_or(DocumentFormat::Md),
        default_mime: "text/markdown",
        section_title: "Markdown",
        stats: output.stats,
        warnings: output.warnings,
        global_metadata: vec![("parser", "markdown-adapter-v1".to_string())],
        done_message: "Markdown AST ready",
    }
    .finish(output.blocks))
}
