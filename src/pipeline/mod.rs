//! Background parsing pipeline
//!
//! Documents are parsed on a [`ParseWorker`] when one is available. Any
//! worker failure (transport, parser error or panic) is retried once on the
//! calling task, so the caller only ever sees the synchronous result.

pub mod protocol;
mod worker;

use thiserror::Error;

use crate::parsers::{parse_with_registry, ParseContext, ParseError, ParsedDocument, SourceFile};

pub use protocol::{WorkerMessage, WorkerRequest};
pub use worker::{ParseWorker, WORKER_THREAD_NAME};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker could not be started or has stopped accepting requests
    #[error("Parse worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The worker answered with an error or died mid-request
    #[error("Parse worker failed: {0}")]
    WorkerFailed(String),
}

/// Parse `file`, preferring the worker and falling back to the calling task.
///
/// Progress from either path goes to `context`'s callback.
pub async fn parse_document(
    worker: Option<&ParseWorker>,
    request_id: &str,
    file: &SourceFile,
    context: &ParseContext,
) -> Result<ParsedDocument, ParseError> {
    if let Some(worker) = worker.filter(|worker| worker.is_running()) {
        match worker
            .parse(request_id, file.clone(), |progress| context.report(progress))
            .await
        {
            Ok(parsed) => return Ok(parsed),
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    file = %file.name,
                    error = %err,
                    "Worker parse failed, retrying on calling task"
                );
            }
        }
    }

    parse_with_registry(file, context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DocumentFormat;
    use crate::parsers::ParseOptions;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn text_file(name: &str, content: &str) -> SourceFile {
        SourceFile::from_bytes(name, content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_parse_without_worker() {
        let parsed = parse_document(None, "r1", &text_file("a.md", "# T"), &ParseContext::default())
            .await
            .unwrap();
        assert_eq!(parsed.ast.metadata.format, DocumentFormat::Md);
    }

    #[tokio::test]
    async fn test_falls_back_when_worker_stopped() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        worker.shutdown();

        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = progress.clone();
        let context = ParseContext::default().with_progress(move |p| sink.lock().push(p.progress));

        let parsed = parse_document(Some(&worker), "r2", &text_file("a.txt", "hello"), &context)
            .await
            .unwrap();
        assert_eq!(parsed.ast.content_bearing_count(), 1);
        assert_eq!(progress.lock().last(), Some(&100));
    }

    #[tokio::test]
    async fn test_worker_progress_reaches_context() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = progress.clone();
        let context = ParseContext::default().with_progress(move |p| sink.lock().push(p.progress));

        parse_document(Some(&worker), "r3", &text_file("a.txt", "a\nb"), &context)
            .await
            .unwrap();
        assert_eq!(progress.lock().last(), Some(&100));
    }

    #[tokio::test]
    async fn test_unsupported_surfaces_sync_error() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        let err = parse_document(Some(&worker), "r4", &text_file("blob.bin", "x"), &ParseContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(DocumentFormat::Unknown)));
    }
}
