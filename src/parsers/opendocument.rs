//! OpenDocument text parser (.odt)
//!
//! Reads `content.xml` from the package. `text:h` elements become headings
//! at their `text:outline-level`, `text:p` elements become paragraphs, and
//! `text:s` / `text:tab` / `text:line-break` expand to whitespace.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::ast::{self, BlockNode, DocumentFormat};

use super::archive::{decode_blocking, read_entry};
use super::sanitize::sanitize_text;
use super::{
    Assembly, ParseContext, ParseError, ParsedDocument, ParserProgress, SourceFile, TextStats,
};

pub const CONTENT_XML: &str = "content.xml";
const ODT_MIME: &str = "application/vnd.oasis.opendocument.text";

enum BlockKind {
    Heading(u8),
    Paragraph,
}

struct OpenBlock {
    kind: BlockKind,
    text: String,
}

fn invalid(err: impl std::fmt::Display) -> ParseError {
    ParseError::invalid_xml(DocumentFormat::Odt, err)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    element
        .try_get_attribute(name)
        .map_err(invalid)?
        .map(|attr| attr.unescape_value().map(|v| v.into_owned()).map_err(invalid))
        .transpose()
}

fn heading_level(element: &BytesStart<'_>) -> Result<u8, ParseError> {
    let level = attribute(element, "text:outline-level")?
        .and_then(|value| value.trim().parse::<u8>().ok())
        .unwrap_or(1);
    Ok(level.clamp(1, 6))
}

/// Convert an OpenDocument `content.xml` into blocks
pub fn content_xml_to_blocks(xml: &str) -> Result<(Vec<BlockNode>, TextStats), ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut blocks = Vec::new();
    let mut stats = TextStats::default();
    let mut current: Option<OpenBlock> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event().map_err(invalid)? {
            Event::Start(element) => match element.name().as_ref() {
                b"text:h" | b"text:p" => {
                    depth += 1;
                    if depth == 1 {
                        let kind = if element.name().as_ref() == b"text:h" {
                            BlockKind::Heading(heading_level(&element)?)
                        } else {
                            BlockKind::Paragraph
                        };
                        current = Some(OpenBlock {
                            kind,
                            text: String::new(),
                        });
                    }
                }
                _ => {}
            },
            Event::Empty(element) => {
                if let Some(block) = current.as_mut() {
                    match element.name().as_ref() {
                        b"text:s" => {
                            let count = attribute(&element, "text:c")?
                                .and_then(|value| value.parse::<usize>().ok())
                                .unwrap_or(1);
                            block.text.push_str(&" ".repeat(count));
                        }
                        b"text:tab" => block.text.push('\t'),
                        b"text:line-break" => block.text.push(' '),
                        _ => {}
                    }
                }
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.text.push_str(&text.unescape().map_err(invalid)?);
                }
            }
            Event::End(element) => {
                if matches!(element.name().as_ref(), b"text:h" | b"text:p") {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(block) = current.take() {
                            let text = block.text.trim();
                            if !text.is_empty() {
                                stats.record(text);
                                blocks.push(match block.kind {
                                    BlockKind::Heading(level) => ast::heading(text, level),
                                    BlockKind::Paragraph => ast::paragraph(text),
                                });
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((blocks, stats))
}

pub async fn parse_odt(file: &SourceFile, context: &ParseContext) -> Result<ParsedDocument, ParseError> {
    let bytes = file.read_all().await?;

    let (blocks, stats) = decode_blocking(move || {
        let xml = sanitize_text(&read_entry(&bytes, CONTENT_XML)?);
        content_xml_to_blocks(&xml)
    })
    .await?;

    context.report(ParserProgress::parsing(
        80,
        file.size,
        file.size,
        "Parsed OpenDocument content.xml",
    ));

    Ok(Assembly {
        file,
        context,
        format: context.format_or(DocumentFormat::Odt),
        default_mime: ODT_MIME,
        section_title: "Document",
        stats,
        warnings: Vec::new(),
        global_metadata: vec![
            ("parser", "odt-content-v1".to_string()),
            ("xml-source", CONTENT_XML.to_string()),
        ],
        done_message: "ODT AST completed",
    }
    .finish(blocks))
}
