//! OpenXML word-processing parser (.docx)
//!
//! Only `word/document.xml` is read. Each top-level `w:p` becomes a heading
//! (when its paragraph style is `Heading1`..`Heading6`) or a paragraph; run
//! properties `w:b`, `w:i` and `w:u` are carried onto the text runs.

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::ast::{self, BlockNode, DocumentFormat, TextRunNode};

use super::archive::{decode_blocking, read_entry};
use super::sanitize::sanitize_text;
use super::{
    Assembly, ParseContext, ParseError, ParsedDocument, ParserProgress, SourceFile, TextStats,
};

pub const DOCUMENT_XML: &str = "word/document.xml";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

static HEADING_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Heading([1-6])$").expect("valid heading style regex"));

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl RunStyle {
    fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

#[derive(Default)]
struct ParagraphBuilder {
    style: Option<String>,
    runs: Vec<(RunStyle, String)>,
}

impl ParagraphBuilder {
    fn push_text(&mut self, style: RunStyle, text: &str) {
        match self.runs.last_mut() {
            Some((last, buffer)) if *last == style => buffer.push_str(text),
            _ => self.runs.push((style, text.to_string())),
        }
    }

    fn into_block(self, stats: &mut TextStats) -> Option<BlockNode> {
        let text: String = self.runs.iter().map(|(_, text)| text.as_str()).collect();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        stats.record(text);

        let level = self
            .style
            .as_deref()
            .and_then(|style| HEADING_STYLE.captures(style))
            .and_then(|caps| caps[1].parse::<u8>().ok());

        Some(match level {
            Some(level) => ast::heading(text, level),
            None if self.runs.iter().all(|(style, _)| style.is_plain()) => ast::paragraph(text),
            None => ast::paragraph_with_runs(trimmed_runs(self.runs)),
        })
    }
}

/// Drop blank edge runs and trim the outer whitespace of what remains
fn trimmed_runs(mut runs: Vec<(RunStyle, String)>) -> Vec<TextRunNode> {
    while runs.first().is_some_and(|(_, text)| text.trim().is_empty()) {
        runs.remove(0);
    }
    while runs.last().is_some_and(|(_, text)| text.trim().is_empty()) {
        runs.pop();
    }
    if let Some((_, text)) = runs.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some((_, text)) = runs.last_mut() {
        *text = text.trim_end().to_string();
    }

    runs.into_iter()
        .filter(|(_, text)| !text.is_empty())
        .map(|(style, text)| ast::styled_run(text, style.bold, style.italic, style.underline))
        .collect()
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| ParseError::invalid_xml(DocumentFormat::Docx, e))?;
    attr.map(|attr| {
        attr.unescape_value()
            .map(|value| value.into_owned())
            .map_err(|e| ParseError::invalid_xml(DocumentFormat::Docx, e))
    })
    .transpose()
}

/// A toggle property is on unless `w:val` switches it off
fn toggle_enabled(element: &BytesStart<'_>) -> Result<bool, ParseError> {
    Ok(!matches!(
        attribute(element, "w:val")?.as_deref(),
        Some("0" | "false" | "none")
    ))
}

#[derive(Default)]
struct WordReader {
    blocks: Vec<BlockNode>,
    stats: TextStats,
    paragraph: Option<ParagraphBuilder>,
    paragraph_depth: usize,
    run_style: RunStyle,
    in_run_properties: bool,
    in_text: bool,
}

impl WordReader {
    fn open(&mut self, element: &BytesStart<'_>) -> Result<(), ParseError> {
        match element.name().as_ref() {
            b"w:p" => {
                self.paragraph_depth += 1;
                if self.paragraph_depth == 1 {
                    self.paragraph = Some(ParagraphBuilder::default());
                }
            }
            b"w:r" => self.run_style = RunStyle::default(),
            b"w:rPr" => self.in_run_properties = true,
            b"w:t" => self.in_text = true,
            _ => self.property(element)?,
        }
        Ok(())
    }

    fn empty(&mut self, element: &BytesStart<'_>) -> Result<(), ParseError> {
        match element.name().as_ref() {
            b"w:tab" => self.text("\t"),
            b"w:br" | b"w:cr" => self.text(" "),
            _ => self.property(element)?,
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"w:p" => {
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
                if self.paragraph_depth == 0 {
                    if let Some(block) = self
                        .paragraph
                        .take()
                        .and_then(|paragraph| paragraph.into_block(&mut self.stats))
                    {
                        self.blocks.push(block);
                    }
                }
            }
            b"w:rPr" => self.in_run_properties = false,
            b"w:t" => self.in_text = false,
            _ => {}
        }
    }

    fn property(&mut self, element: &BytesStart<'_>) -> Result<(), ParseError> {
        match element.name().as_ref() {
            b"w:pStyle" => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    if paragraph.style.is_none() {
                        paragraph.style = attribute(element, "w:val")?;
                    }
                }
            }
            b"w:b" if self.in_run_properties => self.run_style.bold = toggle_enabled(element)?,
            b"w:i" if self.in_run_properties => self.run_style.italic = toggle_enabled(element)?,
            b"w:u" if self.in_run_properties => {
                self.run_style.underline = toggle_enabled(element)?
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        let style = self.run_style;
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_text(style, text);
        }
    }
}

/// Convert a `word/document.xml` body into blocks
pub fn word_xml_to_blocks(xml: &str) -> Result<(Vec<BlockNode>, TextStats), ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut state = WordReader::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::invalid_xml(DocumentFormat::Docx, e))?;
        match event {
            Event::Start(element) => state.open(&element)?,
            Event::Empty(element) => state.empty(&element)?,
            Event::End(element) => state.close(element.name().as_ref()),
            Event::Text(text) if state.in_text => {
                let text = text
                    .unescape()
                    .map_err(|e| ParseError::invalid_xml(DocumentFormat::Docx, e))?;
                state.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((state.blocks, state.stats))
}

pub async fn parse_docx(file: &SourceFile, context: &ParseContext) -> Result<ParsedDocument, ParseError> {
    let bytes = file.read_all().await?;

    let (blocks, stats) = decode_blocking(move || {
        let xml = sanitize_text(&read_entry(&bytes, DOCUMENT_XML)?);
        word_xml_to_blocks(&xml)
    })
    .await?;

    context.report(ParserProgress::parsing(
        80,
        file.size,
        file.size,
        "Parsed OpenXML document.xml",
    ));

    Ok(Assembly {
        file,
        context,
        format: context.format_or(DocumentFormat::Docx),
        default_mime: DOCX_MIME,
        section_title: "Document",
        stats,
        warnings: Vec::new(),
        global_metadata: vec![
            ("parser", "docx-openxml-v1".to_string()),
            ("xml-source", DOCUMENT_XML.to_string()),
        ],
        done_message: "DOCX AST completed",
    }
    .finish(blocks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::archive::fixtures::zip_bytes;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let xml = document(
            r#"<w:p><w:pPr><w:pStyle w:val="heading2"/></w:pPr><w:r><w:t>Overview</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world &amp; more</w:t></w:r></w:p>
<w:p><w:r><w:t>   </w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Not a heading</w:t></w:r></w:p>"#,
        );
        let (blocks, stats) = word_xml_to_blocks(&xml).unwrap();

        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            BlockNode::Heading(node) => assert_eq!(node.level, 2),
            other => panic!("expected heading, got {:?}", other),
        }
        assert_eq!(blocks[1].plain_text(), "Hello world & more");
        assert!(matches!(blocks[2], BlockNode::Paragraph(_)));
        assert_eq!(stats.words, 8);
    }

    #[test]
    fn test_run_styles_survive() {
        let xml = document(
            r#"<w:p><w:r><w:t xml:space="preserve">plain </w:t></w:r><w:r><w:rPr><w:b/><w:i w:val="0"/></w:rPr><w:t>bold</w:t></w:r><w:r><w:tab/><w:t>tail</w:t></w:r></w:p>"#,
        );
        let (blocks, _) = word_xml_to_blocks(&xml).unwrap();
        match &blocks[0] {
            BlockNode::Paragraph(node) => {
                assert_eq!(node.runs.len(), 3);
                assert_eq!(node.runs[0].text, "plain ");
                assert_eq!(node.runs[1].text, "bold");
                assert_eq!(node.runs[1].bold, Some(true));
                assert_eq!(node.runs[1].italic, None);
                assert_eq!(node.runs[2].text, "\ttail");
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        let err = word_xml_to_blocks("<w:document><w:body></w:document>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidXml { .. }));
    }

    #[tokio::test]
    async fn test_parse_docx_archive() {
        let xml = document(r#"<w:p><w:r><w:t>Body text</w:t></w:r></w:p>"#);
        let file = SourceFile::from_bytes("report.docx", zip_bytes(&[(DOCUMENT_XML, &xml)]));
        let parsed = parse_docx(&file, &ParseContext::default()).await.unwrap();

        assert_eq!(parsed.ast.sections[0].title.as_deref(), Some("Document"));
        assert_eq!(parsed.ast.metadata.mime_type, DOCX_MIME);
        assert_eq!(parsed.ast.global("parser"), Some("docx-openxml-v1"));
        assert_eq!(parsed.ast.global("xml-source"), Some("word/document.xml"));
        assert_eq!(parsed.ast.blocks().next().unwrap().plain_text(), "Body text");
    }

    #[tokio::test]
    async fn test_missing_document_xml() {
        let file = SourceFile::from_bytes("broken.docx", zip_bytes(&[("word/styles.xml", "<x/>")]));
        let err = parse_docx(&file, &ParseContext::default()).await.unwrap_err();
        assert!(matches!(err, ParseError::MissingArchiveEntry(_)));
    }
}
