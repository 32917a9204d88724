//! Deferred layout rebuilds
//!
//! A rebuild first yields to the scheduler so in-flight interaction can run,
//! then computes on the blocking pool. Rebuilds may overlap; callers take a
//! [`LayoutGeneration`] ticket before starting and commit only if the ticket
//! is still current when the result arrives.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ast::DocumentAst;

use super::engine::build_layout;
use super::types::{LayoutDocument, LayoutOptions};

pub async fn build_layout_incremental(ast: Arc<DocumentAst>, options: LayoutOptions) -> LayoutDocument {
    tokio::task::yield_now().await;

    let fallback_ast = ast.clone();
    let fallback_options = options.clone();

    match tokio::task::spawn_blocking(move || build_layout(&ast, &options)).await {
        Ok(layout) => layout,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => {
            tracing::debug!(error = %err, "Blocking layout task cancelled, building inline");
            build_layout(&fallback_ast, &fallback_options)
        }
    }
}

/// Monotonic ticket source for overlapping rebuilds
#[derive(Debug, Default)]
pub struct LayoutGeneration {
    current: AtomicU64,
}

impl LayoutGeneration {
    /// Start a new rebuild, invalidating every earlier ticket
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, create_empty_document_ast, DocumentFormat};

    #[tokio::test]
    async fn test_incremental_matches_direct_build() {
        let mut doc = create_empty_document_ast("a.md", 0, "text/markdown", DocumentFormat::Md, vec![]);
        doc.sections = vec![ast::section(None, vec![ast::heading("A", 1), ast::paragraph("b c d")])];
        let doc = Arc::new(doc);
        let options = LayoutOptions::new(1000.0);

        let direct = build_layout(&doc, &options);
        let deferred = build_layout_incremental(doc.clone(), options).await;
        assert_eq!(direct, deferred);
    }

    #[test]
    fn test_only_latest_ticket_is_current() {
        let generation = LayoutGeneration::default();
        let first = generation.next();
        let second = generation.next();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }
}
