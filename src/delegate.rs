//! Delegated rendering for formats the AST pipeline does not parse
//!
//! PDF and legacy binary word-processor files are opened through an
//! [`ExternalRenderer`] supplied by the host. The reader records what the
//! renderer reports (page count, outline) and forwards page rendering;
//! search and annotations are unavailable on this path.

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Renderer failed: {0}")]
    Renderer(String),

    #[error("Document could not be opened: {0}")]
    Open(String),
}

/// Outline (bookmark) entry reported by an external renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineEntry {
    pub title: String,
    /// Zero-based target page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, page_index: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page_index,
            children: Vec::new(),
        }
    }
}

/// Page-image renderer for a delegated document
#[async_trait]
pub trait ExternalRenderer: Send + Sync {
    async fn page_count(&self) -> Result<usize, DelegateError>;

    /// Rasterize one page at `scale` (1.0 = 72 dpi)
    async fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage, DelegateError>;

    async fn outline(&self) -> Result<Vec<OutlineEntry>, DelegateError>;
}

/// Everything the reader knows about an open delegated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedDocument {
    pub file_name: String,
    pub format: crate::ast::DocumentFormat,
    pub page_count: usize,
    pub outline: Vec<OutlineEntry>,
}

/// Check `index` against `count` before calling into a renderer
pub fn ensure_page(index: usize, count: usize) -> Result<(), DelegateError> {
    if index < count {
        Ok(())
    } else {
        Err(DelegateError::PageOutOfRange { index, count })
    }
}
