//! Input sanitization
//!
//! Text is normalized before any node is built: line endings collapse to
//! `\n` and stray control characters become spaces. HTML additionally goes
//! through a lol_html rewrite that strips active content.

use std::cell::Cell;

use lol_html::{element, rewrite_str, RewriteStrSettings};

use super::ParseError;

/// Normalize line endings and replace control characters (other than tab
/// and newline) with spaces.
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\t' | '\n' => out.push(ch),
            c if is_stripped_control(c) => out.push(' '),
            c => out.push(c),
        }
    }

    out
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}')
}

/// Sanitized HTML plus how many elements and attributes were dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedHtml {
    pub html: String,
    pub removed: usize,
}

const STRIPPED_ELEMENTS: [&str; 6] = ["script", "style", "iframe", "object", "embed", "link"];

/// Remove scripts, embedded objects, stylesheets, inline event handlers
/// and `javascript:` links from an HTML document.
pub fn sanitize_html(html: &str) -> Result<SanitizedHtml, ParseError> {
    let removed = Cell::new(0usize);
    let bump = || removed.set(removed.get() + 1);

    let mut handlers = Vec::with_capacity(STRIPPED_ELEMENTS.len() + 1);
    for tag in STRIPPED_ELEMENTS {
        handlers.push(element!(tag, |el| {
            el.remove();
            bump();
            Ok(())
        }));
    }
    handlers.push(element!("*", |el| {
        let names: Vec<String> = el
            .attributes()
            .iter()
            .map(|attr| attr.name())
            .filter(|name| name.to_ascii_lowercase().starts_with("on"))
            .collect();
        for name in names {
            el.remove_attribute(&name);
            bump();
        }
        for attr in ["href", "src"] {
            if let Some(value) = el.get_attribute(attr) {
                if value.trim().to_ascii_lowercase().starts_with("javascript:") {
                    el.remove_attribute(attr);
                    bump();
                }
            }
        }
        Ok(())
    }));

    let html = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ParseError::Html(e.to_string()))?;

    Ok(SanitizedHtml {
        html,
        removed: removed.get(),
    })
}

/// Pretty-print JSON with a two-space indent; `None` when the input is not JSON.
pub fn pretty_json(source: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(source).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_line_endings() {
        assert_eq!(sanitize_text("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn test_sanitize_text_control_chars() {
        assert_eq!(sanitize_text("a\u{0}b\u{7}c\td\u{1B}"), "a b c\td ");
        assert_eq!(sanitize_text("caf\u{e9}"), "caf\u{e9}");
    }

    #[test]
    fn test_sanitize_html_removes_active_content() {
        let html = r#"<p onclick="x()" onmouseenter="y()">Hi<script>alert(1)</script></p><iframe src="e"></iframe><a href="javascript:void(0)">link</a><img src="a.png">"#;
        let sanitized = sanitize_html(html).unwrap();
        // script, iframe, two handlers, one javascript: href
        assert_eq!(sanitized.removed, 5);
        let clean = sanitized.html;
        assert!(!clean.contains("script"));
        assert!(!clean.contains("iframe"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("onmouseenter"));
        assert!(!clean.contains("javascript:"));
        assert!(clean.contains("<p>Hi</p>"));
        assert!(clean.contains(r#"<img src="a.png">"#));
    }

    #[test]
    fn test_sanitize_clean_html_removes_nothing() {
        let sanitized = sanitize_html("<p>plain</p>").unwrap();
        assert_eq!(sanitized.removed, 0);
        assert_eq!(sanitized.html, "<p>plain</p>");
        assert_eq!(sanitize_html("").unwrap().removed, 0);
    }

    #[test]
    fn test_pretty_json() {
        assert_eq!(pretty_json(r#"{"a":1}"#).unwrap(), "{\n  \"a\": 1\n}");
        assert!(pretty_json("{not json").is_none());
    }
}
