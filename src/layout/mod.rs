//! Layout engine: AST → paginated, measured, line-wrapped blocks

mod engine;
mod incremental;
mod types;

pub use engine::{build_layout, chars_per_line, wrap_text, GLYPH_WIDTH_FACTOR, TEXT_COLOR};
pub use incremental::{build_layout_incremental, LayoutGeneration};
pub use types::{LayoutBlock, LayoutBlockKind, LayoutDocument, LayoutLine, LayoutOptions};
