//! Viewport state and virtualization
//!
//! Only blocks intersecting `[scroll_top − overscan, scroll_top +
//! viewport_height + overscan]` are rendered. Blocks are sorted by `y` and
//! never overlap, so both ends of the slice come from one forward scan.

use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::layout::{LayoutBlock, LayoutDocument};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub viewport_width: f64,
    pub overscan: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::from_config(&ViewportConfig::default())
    }
}

impl ViewportState {
    pub fn from_config(config: &ViewportConfig) -> Self {
        Self {
            scroll_top: 0.0,
            viewport_height: config.height,
            viewport_width: config.width,
            overscan: config.overscan,
        }
    }

    /// Document-space window `(top, bottom)` including overscan
    pub fn window(&self) -> (f64, f64) {
        (
            (self.scroll_top - self.overscan).max(0.0),
            self.scroll_top + self.viewport_height + self.overscan,
        )
    }

    /// Merge `patch`; returns whether the width changed
    pub fn apply(&mut self, patch: &ViewportPatch) -> bool {
        let previous_width = self.viewport_width;
        if let Some(scroll_top) = patch.scroll_top {
            self.scroll_top = scroll_top.max(0.0);
        }
        if let Some(height) = patch.viewport_height {
            self.viewport_height = height.max(0.0);
        }
        if let Some(width) = patch.viewport_width {
            self.viewport_width = width.max(0.0);
        }
        if let Some(overscan) = patch.overscan {
            self.overscan = overscan.max(0.0);
        }
        self.viewport_width != previous_width
    }
}

/// Partial viewport update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportPatch {
    pub scroll_top: Option<f64>,
    pub viewport_height: Option<f64>,
    pub viewport_width: Option<f64>,
    pub overscan: Option<f64>,
}

impl ViewportPatch {
    pub fn scroll_to(scroll_top: f64) -> Self {
        Self {
            scroll_top: Some(scroll_top),
            ..Self::default()
        }
    }

    pub fn resize(width: f64, height: f64) -> Self {
        Self {
            viewport_width: Some(width),
            viewport_height: Some(height),
            ..Self::default()
        }
    }
}

/// Half-open index range into `LayoutDocument::blocks`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualSlice {
    pub start_index: usize,
    pub end_index: usize,
}

impl VirtualSlice {
    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn compute_virtual_slice(layout: &LayoutDocument, viewport: &ViewportState) -> VirtualSlice {
    let (top, bottom) = viewport.window();
    let len = layout.blocks.len();

    let start_index = layout
        .blocks
        .iter()
        .position(|block| block.bottom() >= top)
        .unwrap_or(len);

    let end_index = layout.blocks[start_index..]
        .iter()
        .position(|block| block.y > bottom)
        .map_or(len, |offset| start_index + offset);

    VirtualSlice {
        start_index,
        end_index,
    }
}

pub fn visible_blocks<'a>(layout: &'a LayoutDocument, viewport: &ViewportState) -> &'a [LayoutBlock] {
    let slice = compute_virtual_slice(layout, viewport);
    &layout.blocks[slice.start_index..slice.end_index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, create_empty_document_ast, DocumentFormat};
    use crate::layout::{build_layout, LayoutOptions};

    fn layout(paragraphs: usize) -> LayoutDocument {
        let mut doc = create_empty_document_ast("v.txt", 0, "text/plain", DocumentFormat::Txt, vec![]);
        doc.sections = vec![ast::section(
            None,
            (0..paragraphs).map(|i| ast::paragraph(format!("row {i}"))).collect(),
        )];
        build_layout(&doc, &LayoutOptions::new(900.0))
    }

    fn viewport(scroll_top: f64, overscan: f64) -> ViewportState {
        ViewportState {
            scroll_top,
            viewport_height: 400.0,
            viewport_width: 900.0,
            overscan,
        }
    }

    #[test]
    fn test_slice_matches_window_exactly() {
        let layout = layout(500);
        for scroll_top in [0.0, 333.0, 2400.0, 9000.0] {
            let view = viewport(scroll_top, 100.0);
            let (top, bottom) = view.window();
            let slice = compute_virtual_slice(&layout, &view);

            for (index, block) in layout.blocks.iter().enumerate() {
                let intersects = block.bottom() >= top && block.y <= bottom;
                let inside = index >= slice.start_index && index < slice.end_index;
                assert_eq!(intersects, inside, "block {index} at scroll {scroll_top}");
            }
        }
    }

    #[test]
    fn test_slice_past_end_is_empty_at_len() {
        let layout = layout(5);
        let slice = compute_virtual_slice(&layout, &viewport(1_000_000.0, 0.0));
        assert_eq!(slice.start_index, 5);
        assert_eq!(slice.end_index, 5);
        assert!(slice.is_empty());
        assert!(visible_blocks(&layout, &viewport(1_000_000.0, 0.0)).is_empty());
    }

    #[test]
    fn test_empty_layout() {
        let layout = layout(0);
        let slice = compute_virtual_slice(&layout, &ViewportState::default());
        assert_eq!(slice, VirtualSlice { start_index: 0, end_index: 0 });
    }

    #[test]
    fn test_patch_reports_width_change() {
        let mut state = ViewportState::default();
        assert_eq!(state.viewport_height, 800.0);
        assert_eq!(state.overscan, 600.0);

        assert!(!state.apply(&ViewportPatch::scroll_to(250.0)));
        assert_eq!(state.scroll_top, 250.0);
        assert!(state.apply(&ViewportPatch::resize(640.0, 480.0)));
        assert_eq!(state.viewport_height, 480.0);
        assert!(!state.apply(&ViewportPatch::resize(640.0, 500.0)));
    }
}
