//! Rendering: virtualization, drawing surfaces, frame painting and the
//! selectable text overlay

pub mod pixmap;
pub mod recording;
mod renderer;
pub mod surface;
mod text_layer;
pub mod viewport;

pub use pixmap::PixmapSurface;
pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{render_document, RenderOptions, RenderParams};
pub use surface::{Color, DrawSurface, Font};
pub use text_layer::{build_text_layer, TextLayerSpan};
pub use viewport::{compute_virtual_slice, visible_blocks, ViewportPatch, ViewportState, VirtualSlice};
