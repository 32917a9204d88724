//! Format-independent document tree
//!
//! Every parser produces a [`DocumentAst`]: ordered sections holding block
//! nodes (paragraphs, headings, tables, images, code blocks) plus key/value
//! metadata describing how the tree was built. Node constructors live in
//! [`factory`] so that every node receives a process-unique id.

pub mod factory;
mod types;

pub use factory::{
    code_block, create_empty_document_ast, heading, image, metadata, next_id, paragraph,
    paragraph_with_runs, section, styled_run, table, table_cell, table_row, text_run,
};
pub use types::{
    BlockNode, CodeBlockNode, DocumentAst, DocumentFormat, DocumentMetadata, HeadingNode,
    ImageNode, MetadataNode, ParagraphNode, SectionNode, TableCell, TableNode, TableRow,
    TextRunNode,
};
