//! AST node types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detected document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
    Rtf,
    Odt,
    Txt,
    Md,
    Json,
    Xml,
    Yaml,
    Csv,
    Log,
    Ini,
    Html,
    Unknown,
}

impl DocumentFormat {
    /// Map a lowercase file extension to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "rtf" => Some(Self::Rtf),
            "odt" => Some(Self::Odt),
            "txt" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Md),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "yaml" | "yml" => Some(Self::Yaml),
            "csv" => Some(Self::Csv),
            "log" => Some(Self::Log),
            "ini" => Some(Self::Ini),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Rtf => "rtf",
            Self::Odt => "odt",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
            Self::Csv => "csv",
            Self::Log => "log",
            Self::Ini => "ini",
            Self::Html => "html",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of text with optional inline styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRunNode {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphNode {
    pub id: String,
    pub runs: Vec<TextRunNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingNode {
    pub id: String,
    /// Heading level, 1 through 6
    pub level: u8,
    pub runs: Vec<TextRunNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub id: String,
    pub runs: Vec<TextRunNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    pub id: String,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// Block-level content node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockNode {
    Paragraph(ParagraphNode),
    Heading(HeadingNode),
    Table(TableNode),
    Image(ImageNode),
    CodeBlock(CodeBlockNode),
}

impl BlockNode {
    pub fn id(&self) -> &str {
        match self {
            BlockNode::Paragraph(node) => &node.id,
            BlockNode::Heading(node) => &node.id,
            BlockNode::Table(node) => &node.id,
            BlockNode::Image(node) => &node.id,
            BlockNode::CodeBlock(node) => &node.id,
        }
    }

    /// Flattened text: runs concatenated, table cells joined with `" | "`
    /// and rows with newlines, images reduced to their alt text.
    pub fn plain_text(&self) -> String {
        match self {
            BlockNode::Paragraph(node) => join_runs(&node.runs),
            BlockNode::Heading(node) => join_runs(&node.runs),
            BlockNode::CodeBlock(node) => node.text.clone(),
            BlockNode::Image(node) => node.alt_text.clone().unwrap_or_default(),
            BlockNode::Table(node) => node
                .rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .map(|cell| join_runs(&cell.runs))
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether layout emits a block for this node
    pub fn is_content_bearing(&self) -> bool {
        match self {
            BlockNode::Image(node) => {
                node.alt_text.as_deref().is_some_and(|alt| !alt.trim().is_empty())
                    || node.src_ref.is_some()
            }
            _ => !self.plain_text().trim().is_empty(),
        }
    }
}

fn join_runs(runs: &[TextRunNode]) -> String {
    runs.iter().map(|run| run.text.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub children: Vec<BlockNode>,
}

/// Key/value fact about how the document was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataNode {
    pub id: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub format: DocumentFormat,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub word_count: u64,
    pub character_count: u64,
    #[serde(default)]
    pub parser_warnings: Vec<String>,
}

/// Parsed document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAst {
    pub id: String,
    pub metadata: DocumentMetadata,
    pub sections: Vec<SectionNode>,
    pub global_metadata: Vec<MetadataNode>,
}

impl DocumentAst {
    /// All blocks in pre-order
    pub fn blocks(&self) -> impl Iterator<Item = &BlockNode> {
        self.sections.iter().flat_map(|section| section.children.iter())
    }

    pub fn content_bearing_count(&self) -> usize {
        self.blocks().filter(|block| block.is_content_bearing()).count()
    }

    /// Look up a global metadata value by key
    pub fn global(&self, key: &str) -> Option<&str> {
        self.global_metadata
            .iter()
            .find(|node| node.key == key)
            .map(|node| node.value.as_str())
    }
}
