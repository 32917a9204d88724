//! Parser registry
//!
//! Dispatch is a closed match over [`DocumentFormat`]; adding a format means
//! adding an arm here, which the compiler enforces.

use crate::ast::DocumentFormat;

use super::docx::parse_docx;
use super::format::detect_format;
use super::markdown::parse_markdown;
use super::opendocument::parse_odt;
use super::structured::parse_structured_text;
use super::text_stream::parse_text_stream;
use super::{ParseContext, ParseError, ParsedDocument, SourceFile};

/// Where a format is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Parsed into an AST by one of this crate's parsers
    Ast,
    /// Rendered by an external renderer (PDF, legacy binary documents)
    Delegated,
    Unsupported,
}

pub fn route_for(format: DocumentFormat) -> Route {
    match format {
        DocumentFormat::Pdf | DocumentFormat::Doc => Route::Delegated,
        DocumentFormat::Unknown => Route::Unsupported,
        _ => Route::Ast,
    }
}

/// Detect the format of `file` and run the matching parser
pub async fn parse_with_registry(
    file: &SourceFile,
    context: &ParseContext,
) -> Result<ParsedDocument, ParseError> {
    let format = detect_format(file);
    let context = context.clone().with_format(format);

    tracing::debug!(file = %file.name, size = file.size, format = %format, "Dispatching parser");

    match format {
        DocumentFormat::Txt => parse_text_stream(file, &context).await,
        DocumentFormat::Md => parse_markdown(file, &context).await,
        DocumentFormat::Docx => parse_docx(file, &context).await,
        DocumentFormat::Odt => parse_odt(file, &context).await,
        DocumentFormat::Rtf
        | DocumentFormat::Json
        | DocumentFormat::Xml
        | DocumentFormat::Yaml
        | DocumentFormat::Csv
        | DocumentFormat::Log
        | DocumentFormat::Ini
        | DocumentFormat::Html => parse_structured_text(file, &context).await,
        DocumentFormat::Pdf | DocumentFormat::Doc => Err(ParseError::DelegatedFormat(format)),
        DocumentFormat::Unknown => Err(ParseError::UnsupportedFormat(format)),
    }
}
