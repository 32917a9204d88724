//! Universal Reader
//!
//! A format-independent document engine: heterogeneous inputs (plain text,
//! Markdown, OpenXML and OpenDocument word-processing archives, structured text
//! such as CSV/JSON/XML/YAML/INI/HTML) are parsed into one abstract syntax tree,
//! laid out into measured, paginated blocks, and painted through a virtualized
//! raster renderer with annotation and full-text search support.
//!
//! # Architecture
//!
//! ```text
//! SourceFile ─▶ parsers::registry ─▶ DocumentAst ─▶ layout ─▶ LayoutDocument
//!                  ▲ (pipeline worker)                         │
//!                  │                                           ├─▶ render::viewport (visible slice)
//!             ReaderSession ◀── annotations / search ──────────┴─▶ render::renderer (DrawSurface)
//! ```
//!
//! Binary and proprietary formats (PDF, legacy `.doc`) are routed to an
//! [`delegate::ExternalRenderer`] instead of the AST pipeline.

pub mod annotations;
pub mod ast;
pub mod config;
pub mod delegate;
pub mod error;
pub mod layout;
pub mod parsers;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod session;

pub use config::ReaderConfig;
pub use error::{ReaderError, Result};
pub use session::{ReaderSession, ReaderSnapshot};
