//! Layout types

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutBlockKind {
    Heading,
    Paragraph,
    Code,
    Table,
    Image,
}

/// One wrapped line, positioned relative to its block's top
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutLine {
    pub text: String,
    pub y_offset: f64,
}

/// A positioned, measured rendering unit derived from one AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBlock {
    /// `layout-<nodeId>`
    pub id: String,
    pub node_id: String,
    pub kind: LayoutBlockKind,
    pub page_index: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    pub line_height: f64,
    pub font_weight: u16,
    pub color: String,
    pub lines: Vec<LayoutLine>,
    /// Flattened block text, before wrapping
    pub searchable_text: String,
}

impl LayoutBlock {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub blocks: Vec<LayoutBlock>,
    pub total_height: f64,
    pub page_count: u32,
}

/// Geometry inputs for [`build_layout`](super::build_layout)
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub viewport_width: f64,
    pub page_height: f64,
    /// Defaults to `max(min_page_width, viewport_width)`
    pub page_width: Option<f64>,
    pub min_page_width: f64,
    pub margin: f64,
    pub base_font_size: f64,
    pub line_height: f64,
}

impl LayoutOptions {
    pub fn new(viewport_width: f64) -> Self {
        Self::from_config(&LayoutConfig::default(), viewport_width)
    }

    pub fn from_config(config: &LayoutConfig, viewport_width: f64) -> Self {
        Self {
            viewport_width,
            page_height: config.page_height,
            page_width: None,
            min_page_width: config.min_page_width,
            margin: config.margin,
            base_font_size: config.base_font_size,
            line_height: config.line_height,
        }
    }

    pub fn with_page_width(mut self, page_width: f64) -> Self {
        self.page_width = Some(page_width);
        self
    }

    pub fn effective_page_width(&self) -> f64 {
        self.page_width
            .unwrap_or_else(|| self.min_page_width.max(self.viewport_width))
    }

    pub fn content_width(&self) -> f64 {
        (self.effective_page_width() - self.margin * 2.0).max(0.0)
    }
}
