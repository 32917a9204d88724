//! Generic structured-text parser
//!
//! Handles every text-like format without a dedicated parser: CSV becomes a
//! table, XML/YAML/INI a single tagged code block, JSON a pretty-printed code
//! block, and everything else (logs, RTF source, sanitized HTML) one
//! paragraph per non-blank line.

use crate::ast::{self, BlockNode, DocumentFormat};

use super::sanitize::{pretty_json, sanitize_html, sanitize_text};
use super::{
    parsing_percent, Assembly, ParseContext, ParseError, ParsedDocument, ParserProgress,
    SourceFile, TextStats,
};

pub const HTML_SANITIZED_WARNING: &str = "HTML scripts and active content were removed by sanitizer.";
pub const INVALID_JSON_WARNING: &str = "Invalid JSON detected, rendered as plain text.";

/// Split one CSV line into trimmed cells. Commas inside double quotes are
/// literal and `""` inside quotes is an escaped quote.
pub fn split_csv_line(input: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            _ => cell.push(ch),
        }
    }

    cells.push(cell.trim().to_string());
    cells
}

pub async fn parse_structured_text(
    file: &SourceFile,
    context: &ParseContext,
) -> Result<ParsedDocument, ParseError> {
    let format = context.format_or(DocumentFormat::Txt);
    let mut warnings = Vec::new();
    let mut source = sanitize_text(&file.read_text().await?);

    match format {
        DocumentFormat::Html => {
            let sanitized = sanitize_html(&source)?;
            if sanitized.removed > 0 {
                tracing::debug!(file = %file.name, removed = sanitized.removed, "Stripped active HTML content");
                warnings.push(HTML_SANITIZED_WARNING.to_string());
            }
            source = sanitized.html;
        }
        DocumentFormat::Json if !source.trim().is_empty() => match pretty_json(&source) {
            Some(pretty) => source = pretty,
            None => {
                tracing::debug!(file = %file.name, "JSON did not parse, falling back to plain text");
                warnings.push(INVALID_JSON_WARNING.to_string());
            }
        },
        _ => {}
    }

    let mut blocks: Vec<BlockNode> = Vec::new();
    let mut stats = TextStats::default();

    match format {
        DocumentFormat::Csv => {
            let rows: Vec<Vec<String>> = source
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(split_csv_line)
                .collect();
            if !rows.is_empty() {
                for value in rows.iter().flatten() {
                    stats.record(value);
                }
                blocks.push(ast::table(rows));
            }
        }
        DocumentFormat::Xml | DocumentFormat::Yaml | DocumentFormat::Ini => {
            let code = source.trim();
            if !code.is_empty() {
                stats.record(code);
                blocks.push(ast::code_block(code, Some(format.as_str())));
            }
        }
        DocumentFormat::Json if warnings.is_empty() => {
            let code = source.trim();
            if !code.is_empty() {
                stats.record(code);
                blocks.push(ast::code_block(code, Some(format.as_str())));
            }
        }
        _ => {
            let lines: Vec<&str> = source.split('\n').collect();
            let total = lines.len() as u64;
            let every = context.options.yield_every_lines.max(1);
            let message = format!("Normalizing {} content", format.as_str().to_uppercase());

            for (index, line) in lines.iter().enumerate() {
                let line = line.trim_end();
                if !line.trim().is_empty() {
                    stats.record(line);
                    blocks.push(ast::paragraph(line));
                }

                if index % every == 0 {
                    let done = index as u64;
                    context.report(ParserProgress::parsing(
                        parsing_percent(done, total),
                        done * file.size / total.max(1),
                        file.size,
                        message.as_str(),
                    ));
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    Ok(Assembly {
        file,
        context,
        format,
        default_mime: "text/plain",
        section_title: "Content",
        stats,
        warnings,
        global_metadata: vec![("parser", "generic-text-v1".to_string())],
        done_message: "Text AST completed",
    }
    .finish(blocks))
}
