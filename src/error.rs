//! Top-level error type for reader sessions.
//!
//! Each subsystem keeps its own error enum (`ParseError`, `PipelineError`,
//! `StorageError`, `DelegateError`); this type is what session operations
//! surface to callers.

use thiserror::Error;

use crate::delegate::DelegateError;
use crate::parsers::ParseError;
use crate::pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum ReaderError {
    /// Parsing failed on both the worker and the synchronous path
    #[error("Failed to parse document: {0}")]
    Parse(#[from] ParseError),

    /// Worker transport failure that could not be recovered
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// An operation needs an open document
    #[error("No document is open")]
    NoDocument,

    /// A newer open request replaced this one before it committed
    #[error("Request {0} was superseded by a newer request")]
    Superseded(String),

    /// External renderer failure
    #[error("Delegated renderer error: {0}")]
    Delegate(#[from] DelegateError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendering or export failure
    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
