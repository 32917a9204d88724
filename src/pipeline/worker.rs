//! Background parse worker
//!
//! Parsing runs on a dedicated OS thread with its own single-threaded tokio
//! runtime, so a pathological document never stalls the caller's executor.
//! Several requests may be in flight at once; each runs as its own task on
//! the worker runtime.
//!
//! # Message flow
//!
//! ```text
//! caller ──WorkerRequest──▶ worker thread ──WorkerMessage──▶ router task ──▶ per-request inbox
//! ```
//!
//! All worker output travels over one channel. The router task (running on
//! the caller's runtime) delivers each message to the inbox registered for
//! its request id and drops messages for ids nobody is waiting on. When the
//! worker thread dies the channel closes, the router drops every inbox, and
//! each waiting caller sees the failure.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::parsers::{parse_with_registry, ParseContext, ParseOptions, ParsedDocument, ParserProgress, SourceFile};

use super::protocol::{WorkerMessage, WorkerRequest};
use super::PipelineError;

pub const WORKER_THREAD_NAME: &str = "ureader-parser";

type Routes = Arc<Mutex<HashMap<String, UnboundedSender<WorkerMessage>>>>;

/// Handle to the background parse worker
pub struct ParseWorker {
    commands: Mutex<Option<UnboundedSender<WorkerRequest>>>,
    routes: Routes,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ParseWorker {
    /// Start the worker thread. Must be called from within a tokio runtime,
    /// which hosts the message router.
    pub fn spawn(options: ParseOptions) -> Result<Self, PipelineError> {
        let handle = Handle::try_current()
            .map_err(|e| PipelineError::WorkerUnavailable(format!("no async runtime: {}", e)))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(command_rx, event_tx, options))
            .map_err(|e| PipelineError::WorkerUnavailable(e.to_string()))?;

        let routes = Routes::default();
        handle.spawn(route_messages(event_rx, routes.clone()));

        tracing::info!(thread = WORKER_THREAD_NAME, "Parse worker started");

        Ok(Self {
            commands: Mutex::new(Some(command_tx)),
            routes,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Whether the worker thread is alive and accepting requests
    pub fn is_running(&self) -> bool {
        let accepting = self
            .commands
            .lock()
            .as_ref()
            .is_some_and(|commands| !commands.is_closed());
        let alive = self
            .thread
            .lock()
            .as_ref()
            .is_some_and(|thread| !thread.is_finished());
        accepting && alive
    }

    /// Number of requests currently awaiting a terminal message
    pub fn in_flight(&self) -> usize {
        self.routes.lock().len()
    }

    /// Parse `file` on the worker, forwarding progress to `on_progress`.
    pub async fn parse(
        &self,
        request_id: &str,
        file: SourceFile,
        mut on_progress: impl FnMut(ParserProgress),
    ) -> Result<ParsedDocument, PipelineError> {
        let (inbox_tx, mut inbox) = mpsc::unbounded_channel();
        self.routes.lock().insert(request_id.to_string(), inbox_tx);
        let _route = RouteGuard {
            routes: self.routes.clone(),
            request_id: request_id.to_string(),
        };

        let request = WorkerRequest::Parse {
            request_id: request_id.to_string(),
            file,
        };
        let sent = match self.commands.lock().as_ref() {
            Some(commands) => commands.send(request).is_ok(),
            None => false,
        };
        if !sent {
            return Err(PipelineError::WorkerUnavailable(
                "worker is not accepting requests".to_string(),
            ));
        }

        tracing::debug!(request_id = %request_id, "Parse request dispatched to worker");

        while let Some(message) = inbox.recv().await {
            if message.request_id() != request_id {
                continue;
            }
            match message {
                WorkerMessage::Progress { progress, .. } => on_progress(progress),
                WorkerMessage::Success { ast, warnings, .. } => {
                    return Ok(ParsedDocument { ast, warnings })
                }
                WorkerMessage::Error { error, .. } => return Err(PipelineError::WorkerFailed(error)),
            }
        }

        Err(PipelineError::WorkerFailed(
            "worker stopped before responding".to_string(),
        ))
    }

    /// Stop accepting requests; the worker thread exits once its queue drains.
    pub fn shutdown(&self) {
        if self.commands.lock().take().is_some() {
            tracing::info!(thread = WORKER_THREAD_NAME, "Parse worker shutting down");
        }
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Removes a request's inbox when its caller stops waiting
struct RouteGuard {
    routes: Routes,
    request_id: String,
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.routes.lock().remove(&self.request_id);
    }
}

async fn route_messages(mut events: UnboundedReceiver<WorkerMessage>, routes: Routes) {
    while let Some(message) = events.recv().await {
        let mut routes = routes.lock();
        let request_id = message.request_id().to_string();
        let terminal = message.is_terminal();

        match routes.get(&request_id) {
            Some(inbox) => {
                let _ = inbox.send(message);
                if terminal {
                    routes.remove(&request_id);
                }
            }
            None => {
                tracing::debug!(request_id = %request_id, "Ignoring worker message for unknown request");
            }
        }
    }

    let abandoned = {
        let mut routes = routes.lock();
        let count = routes.len();
        routes.clear();
        count
    };
    if abandoned > 0 {
        tracing::warn!(abandoned, "Parse worker channel closed with requests in flight");
    }
}

fn run_worker(
    mut commands: UnboundedReceiver<WorkerRequest>,
    events: UnboundedSender<WorkerMessage>,
    options: ParseOptions,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "Failed to build parse worker runtime");
            return;
        }
    };

    runtime.block_on(async move {
        while let Some(request) = commands.recv().await {
            match request {
                WorkerRequest::Parse { request_id, file } => {
                    tokio::spawn(handle_parse(request_id, file, options.clone(), events.clone()));
                }
            }
        }
    });
}

async fn handle_parse(
    request_id: String,
    file: SourceFile,
    options: ParseOptions,
    events: UnboundedSender<WorkerMessage>,
) {
    let progress_events = events.clone();
    let progress_id = request_id.clone();
    let context = ParseContext::new(options).with_progress(move |progress| {
        let _ = progress_events.send(WorkerMessage::Progress {
            request_id: progress_id.clone(),
            progress,
        });
    });

    let outcome = AssertUnwindSafe(parse_with_registry(&file, &context))
        .catch_unwind()
        .await;

    let message = match outcome {
        Ok(Ok(parsed)) => WorkerMessage::success(request_id, parsed),
        Ok(Err(err)) => WorkerMessage::Error {
            request_id,
            error: err.to_string(),
        },
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            tracing::error!(request_id = %request_id, reason = %reason, "Parser panicked on worker");
            WorkerMessage::Error {
                request_id,
                error: reason,
            }
        }
    };

    let _ = events.send(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DocumentFormat;

    fn text_file(name: &str, content: &str) -> SourceFile {
        SourceFile::from_bytes(name, content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_worker_parses_and_reports_progress() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        assert!(worker.is_running());

        let mut events = Vec::new();
        let parsed = worker
            .parse("parse-1", text_file("a.txt", "one\ntwo"), |p| events.push(p.progress))
            .await
            .unwrap();

        assert_eq!(parsed.ast.metadata.format, DocumentFormat::Txt);
        assert_eq!(parsed.ast.content_bearing_count(), 2);
        assert_eq!(events.last(), Some(&100));
        assert_eq!(worker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_correlated() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();

        let (first, second) = tokio::join!(
            worker.parse("parse-a", text_file("a.md", "# Alpha"), |_| {}),
            worker.parse("parse-b", text_file("b.csv", "x,y"), |_| {}),
        );

        assert_eq!(first.unwrap().ast.metadata.format, DocumentFormat::Md);
        assert_eq!(second.unwrap().ast.metadata.format, DocumentFormat::Csv);
    }

    #[tokio::test]
    async fn test_worker_reports_parser_errors() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        let err = worker
            .parse("parse-x", text_file("blob.bin", "??"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::WorkerFailed(message) if message.contains("Unsupported")));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_requests() {
        let worker = ParseWorker::spawn(ParseOptions::default()).unwrap();
        worker.shutdown();
        assert!(!worker.is_running());

        let err = worker
            .parse("parse-late", text_file("a.txt", "x"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::WorkerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_router_ignores_unknown_ids() {
        let routes = Routes::default();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (inbox_tx, mut inbox) = mpsc::unbounded_channel();
        routes.lock().insert("known".to_string(), inbox_tx);

        event_tx
            .send(WorkerMessage::Error {
                request_id: "stale".into(),
                error: "old".into(),
            })
            .unwrap();
        event_tx
            .send(WorkerMessage::Error {
                request_id: "known".into(),
                error: "current".into(),
            })
            .unwrap();
        drop(event_tx);

        route_messages(event_rx, routes.clone()).await;

        match inbox.recv().await {
            Some(WorkerMessage::Error { error, .. }) => assert_eq!(error, "current"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(inbox.recv().await.is_none());
        assert!(routes.lock().is_empty());
    }

    #[test]
    fn test_spawn_requires_runtime() {
        assert!(matches!(
            ParseWorker::spawn(ParseOptions::default()),
            Err(PipelineError::WorkerUnavailable(_))
        ));
    }
}
