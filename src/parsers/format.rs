//! Format detection
//!
//! The file extension wins; the MIME type is consulted only when the
//! extension is missing or unknown. Hosts that do not report a MIME type get
//! one guessed from the file name.

use crate::ast::DocumentFormat;

use super::SourceFile;

/// Infer a format from a file name and MIME type
pub fn infer_format(file_name: &str, mime_type: &str) -> DocumentFormat {
    let by_extension = file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| DocumentFormat::from_extension(&ext.to_ascii_lowercase()));
    if let Some(format) = by_extension {
        return format;
    }

    let mime = mime_type.to_ascii_lowercase();
    let fallbacks = [
        ("pdf", DocumentFormat::Pdf),
        ("wordprocessingml", DocumentFormat::Docx),
        ("msword", DocumentFormat::Doc),
        ("rtf", DocumentFormat::Rtf),
        ("opendocument.text", DocumentFormat::Odt),
        ("markdown", DocumentFormat::Md),
        ("json", DocumentFormat::Json),
        ("xml", DocumentFormat::Xml),
        ("yaml", DocumentFormat::Yaml),
        ("yml", DocumentFormat::Yaml),
        ("csv", DocumentFormat::Csv),
        ("html", DocumentFormat::Html),
    ];

    fallbacks
        .iter()
        .find(|(needle, _)| mime.contains(needle))
        .map(|(_, format)| *format)
        .unwrap_or(if mime.starts_with("text/") {
            DocumentFormat::Txt
        } else {
            DocumentFormat::Unknown
        })
}

/// MIME type reported by the host, or one guessed from the file name
pub fn effective_mime_type(file: &SourceFile) -> String {
    file.mime_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file.name)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default()
    })
}

/// Detect the format of a source file
pub fn detect_format(file: &SourceFile) -> DocumentFormat {
    infer_format(&file.name, &effective_mime_type(file))
}

/// Formats whose content ends up in the AST and can be searched as text
pub fn is_text_searchable_format(format: DocumentFormat) -> bool {
    !matches!(
        format,
        DocumentFormat::Pdf | DocumentFormat::Doc | DocumentFormat::Unknown
    )
}
