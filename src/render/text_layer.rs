//! Selectable text overlay
//!
//! One span per wrapped line, positioned over the painted text so hosts can
//! offer native selection and copy on top of the raster.

use serde::{Deserialize, Serialize};

use crate::layout::{LayoutBlock, GLYPH_WIDTH_FACTOR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayerSpan {
    /// `<blockId>-<lineIndex>`
    pub id: String,
    pub block_id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub fn build_text_layer(blocks: &[LayoutBlock], zoom: f64) -> Vec<TextLayerSpan> {
    blocks
        .iter()
        .flat_map(|block| {
            let font_size = block.font_size * zoom;
            let line_px = block.font_size * block.line_height * zoom;

            block.lines.iter().enumerate().map(move |(index, line)| TextLayerSpan {
                id: format!("{}-{}", block.id, index),
                block_id: block.id.clone(),
                text: line.text.clone(),
                x: block.x * zoom,
                y: (block.y + line.y_offset) * zoom,
                width: (line.text.chars().count() as f64 * font_size * GLYPH_WIDTH_FACTOR).max(8.0),
                height: line_px.max(font_size + 4.0),
            })
        })
        .collect()
}
