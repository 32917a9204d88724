//! Parser error types

use thiserror::Error;

use crate::ast::DocumentFormat;

#[derive(Debug, Error)]
pub enum ParseError {
    /// No parser handles this format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(DocumentFormat),

    /// Format is handled by an external renderer, not the AST pipeline
    #[error("Format {0} is delegated to an external renderer")]
    DelegatedFormat(DocumentFormat),

    /// Malformed XML inside a word-processing archive
    #[error("Invalid {format} XML structure: {message}")]
    InvalidXml { format: DocumentFormat, message: String },

    /// Required archive member is missing
    #[error("{0} not found in archive")]
    MissingArchiveEntry(String),

    #[error("Failed to read archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTML sanitizer failure
    #[error("HTML rewrite error: {0}")]
    Html(String),

    /// The parse task was cancelled before completion
    #[error("Parse cancelled")]
    Cancelled,
}

impl ParseError {
    pub(crate) fn invalid_xml(format: DocumentFormat, err: impl std::fmt::Display) -> Self {
        ParseError::InvalidXml {
            format,
            message: err.to_string(),
        }
    }
}
