//! Format parsers
//!
//! Every parser turns a [`SourceFile`] into a [`ParsedDocument`]: one AST
//! plus the non-fatal warnings raised while building it.
//!
//! # Architecture
//!
//! ```text
//! registry::parse_with_registry
//!   ├── txt            → text_stream  (chunked, UTF-8 carry, yields per chunk)
//!   ├── md             → markdown     (line state machine)
//!   ├── docx           → docx         (zip + word/document.xml)
//!   ├── odt            → opendocument (zip + content.xml)
//!   └── rtf/json/xml/yaml/csv/log/ini/html → structured
//! ```
//!
//! Progress is reported through an optional callback on [`ParseContext`];
//! every parser finishes with a `normalizing / 100` event.

mod archive;
pub mod docx;
mod error;
pub mod format;
pub mod markdown;
pub mod opendocument;
pub mod registry;
pub mod sanitize;
mod source;
pub mod structured;
pub mod text_stream;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::{self, BlockNode, DocumentAst, DocumentFormat};
use crate::config::ParsingConfig;

pub use error::ParseError;
pub use format::{detect_format, infer_format, is_text_searchable_format};
pub use registry::{parse_with_registry, route_for, Route};
pub use source::{SourceData, SourceFile};

/// Parser phase reported with progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePhase {
    Parsing,
    Normalizing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserProgress {
    pub phase: ParsePhase,
    /// Percentage, 0 through 100
    pub progress: u8,
    pub loaded_bytes: u64,
    pub total_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ParserProgress {
    pub fn parsing(progress: u8, loaded_bytes: u64, total_bytes: u64, message: impl Into<String>) -> Self {
        Self {
            phase: ParsePhase::Parsing,
            progress: progress.min(100),
            loaded_bytes,
            total_bytes,
            message: Some(message.into()),
        }
    }

    pub fn finished(total_bytes: u64, message: impl Into<String>) -> Self {
        Self {
            phase: ParsePhase::Normalizing,
            progress: 100,
            loaded_bytes: total_bytes,
            total_bytes,
            message: Some(message.into()),
        }
    }
}

/// Tunables shared by all parsers
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub chunk_size_bytes: usize,
    pub large_file_warning_bytes: u64,
    pub yield_every_lines: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParsingConfig::default().into()
    }
}

impl From<ParsingConfig> for ParseOptions {
    fn from(config: ParsingConfig) -> Self {
        Self {
            chunk_size_bytes: config.chunk_size_bytes.max(1),
            large_file_warning_bytes: config.large_file_warning_bytes,
            yield_every_lines: config.yield_every_lines.max(1),
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(ParserProgress) + Send + Sync>;

/// Per-parse context: the detected format, tunables and progress sink
#[derive(Clone, Default)]
pub struct ParseContext {
    pub format: Option<DocumentFormat>,
    pub options: ParseOptions,
    on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("format", &self.format)
            .field("options", &self.options)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl ParseContext {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            format: None,
            options,
            on_progress: None,
        }
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(ParserProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn format_or(&self, fallback: DocumentFormat) -> DocumentFormat {
        self.format.unwrap_or(fallback)
    }

    pub fn report(&self, progress: ParserProgress) {
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub ast: DocumentAst,
    pub warnings: Vec<String>,
}

/// Word and character counters accumulated while nodes are built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub words: u64,
    pub characters: u64,
}

impl TextStats {
    pub fn record(&mut self, text: &str) {
        self.words += text.split_whitespace().count() as u64;
        self.characters += text.chars().count() as u64;
    }
}

/// Final assembly shared by every parser: wraps the blocks in one titled
/// section (an empty paragraph when there are none), fills counts and
/// metadata, and emits the terminal progress event.
pub(crate) struct Assembly<'a> {
    pub file: &'a SourceFile,
    pub context: &'a ParseContext,
    pub format: DocumentFormat,
    pub default_mime: &'a str,
    pub section_title: &'a str,
    pub stats: TextStats,
    pub warnings: Vec<String>,
    pub global_metadata: Vec<(&'static str, String)>,
    pub done_message: &'a str,
}

impl Assembly<'_> {
    pub fn finish(self, mut blocks: Vec<BlockNode>) -> ParsedDocument {
        if blocks.is_empty() {
            blocks.push(ast::paragraph(""));
        }

        let mime_type = self
            .file
            .mime_type
            .clone()
            .unwrap_or_else(|| self.default_mime.to_string());

        let mut document = ast::create_empty_document_ast(
            &self.file.name,
            self.file.size,
            &mime_type,
            self.format,
            self.warnings.clone(),
        );
        document.sections = vec![ast::section(Some(self.section_title), blocks)];
        document.metadata.word_count = self.stats.words;
        document.metadata.character_count = self.stats.characters;
        document.global_metadata = self
            .global_metadata
            .into_iter()
            .map(|(key, value)| ast::metadata(key, value))
            .collect();

        tracing::debug!(
            document_id = %document.id,
            format = %self.format,
            blocks = document.sections[0].children.len(),
            words = self.stats.words,
            "Document AST assembled"
        );

        self.context
            .report(ParserProgress::finished(self.file.size, self.done_message));

        ParsedDocument {
            ast: document,
            warnings: self.warnings,
        }
    }
}

/// Percentage of `done` over `total`, scaled into 0..=95 for the parsing phase
pub(crate) fn parsing_percent(done: u64, total: u64) -> u8 {
    let total = total.max(1);
    ((done.saturating_mul(95)) / total).min(95) as u8
}
