//! Node constructors
//!
//! Ids are `{prefix}-{unix_millis}-{counter}` where the counter is a
//! process-wide atomic, so ids never repeat within a process even when two
//! documents are parsed in the same millisecond.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::types::{
    BlockNode, CodeBlockNode, DocumentAst, DocumentFormat, DocumentMetadata, HeadingNode,
    ImageNode, MetadataNode, ParagraphNode, SectionNode, TableCell, TableNode, TableRow,
    TextRunNode,
};

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Allocate a fresh node id
pub fn next_id(prefix: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), counter)
}

pub fn text_run(text: impl Into<String>) -> TextRunNode {
    TextRunNode {
        id: next_id("run"),
        text: text.into(),
        bold: None,
        italic: None,
        underline: None,
    }
}

/// Text run with explicit styling; `false` flags are left unset.
pub fn styled_run(text: impl Into<String>, bold: bool, italic: bool, underline: bool) -> TextRunNode {
    TextRunNode {
        bold: bold.then_some(true),
        italic: italic.then_some(true),
        underline: underline.then_some(true),
        ..text_run(text)
    }
}

pub fn paragraph(text: impl Into<String>) -> BlockNode {
    paragraph_with_runs(vec![text_run(text)])
}

pub fn paragraph_with_runs(runs: Vec<TextRunNode>) -> BlockNode {
    BlockNode::Paragraph(ParagraphNode {
        id: next_id("p"),
        runs,
    })
}

/// Heading with a single bold run. The level is clamped to 1..=6.
pub fn heading(text: impl Into<String>, level: u8) -> BlockNode {
    BlockNode::Heading(HeadingNode {
        id: next_id("h"),
        level: level.clamp(1, 6),
        runs: vec![styled_run(text, true, false, false)],
    })
}

pub fn code_block(text: impl Into<String>, language: Option<&str>) -> BlockNode {
    BlockNode::CodeBlock(CodeBlockNode {
        id: next_id("code"),
        language: language.filter(|lang| !lang.is_empty()).map(str::to_string),
        text: text.into(),
    })
}

pub fn table_cell(text: impl Into<String>) -> TableCell {
    TableCell {
        id: next_id("cell"),
        runs: vec![text_run(text)],
    }
}

pub fn table_row<S: Into<String>>(values: impl IntoIterator<Item = S>) -> TableRow {
    TableRow {
        id: next_id("row"),
        cells: values.into_iter().map(|value| table_cell(value)).collect(),
    }
}

pub fn table<R, S>(rows: impl IntoIterator<Item = R>) -> BlockNode
where
    R: IntoIterator<Item = S>,
    S: Into<String>,
{
    BlockNode::Table(TableNode {
        id: next_id("table"),
        rows: rows.into_iter().map(|row| table_row(row)).collect(),
    })
}

pub fn image(alt_text: Option<String>, src_ref: Option<String>) -> BlockNode {
    BlockNode::Image(ImageNode {
        id: next_id("img"),
        alt_text,
        src_ref,
        width: None,
        height: None,
    })
}

pub fn section(title: Option<&str>, children: Vec<BlockNode>) -> SectionNode {
    SectionNode {
        id: next_id("section"),
        title: title.map(str::to_string),
        children,
    }
}

pub fn metadata(key: impl Into<String>, value: impl Into<String>) -> MetadataNode {
    MetadataNode {
        id: next_id("meta"),
        key: key.into(),
        value: value.into(),
    }
}

/// One-section skeleton ("Main") with zeroed counts; parsers replace the
/// sections and fill the counts in.
pub fn create_empty_document_ast(
    file_name: &str,
    file_size_bytes: u64,
    mime_type: &str,
    format: DocumentFormat,
    parser_warnings: Vec<String>,
) -> DocumentAst {
    DocumentAst {
        id: next_id("doc"),
        metadata: DocumentMetadata {
            file_name: file_name.to_string(),
            file_size_bytes,
            mime_type: mime_type.to_string(),
            format,
            created_at: Utc::now(),
            page_count: Some(1),
            word_count: 0,
            character_count: 0,
            parser_warnings,
        },
        sections: vec![section(Some("Main"), Vec::new())],
        global_metadata: Vec::new(),
    }
}
