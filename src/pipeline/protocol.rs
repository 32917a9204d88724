//! Worker wire protocol
//!
//! Every message carries the request id it belongs to; receivers drop
//! messages whose id they are not waiting for. Exactly one terminal
//! message (`success` or `error`) is sent per request.

use serde::{Deserialize, Serialize};

use crate::ast::DocumentAst;
use crate::parsers::{ParsedDocument, ParserProgress, SourceFile};

/// Request sent to the parse worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    #[serde(rename_all = "camelCase")]
    Parse { request_id: String, file: SourceFile },
}

impl WorkerRequest {
    pub fn request_id(&self) -> &str {
        match self {
            WorkerRequest::Parse { request_id, .. } => request_id,
        }
    }
}

/// Message sent back by the parse worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerMessage {
    #[serde(rename_all = "camelCase")]
    Progress {
        request_id: String,
        progress: ParserProgress,
    },
    #[serde(rename_all = "camelCase")]
    Success {
        request_id: String,
        ast: DocumentAst,
        warnings: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Error { request_id: String, error: String },
}

impl WorkerMessage {
    pub fn request_id(&self) -> &str {
        match self {
            WorkerMessage::Progress { request_id, .. }
            | WorkerMessage::Success { request_id, .. }
            | WorkerMessage::Error { request_id, .. } => request_id,
        }
    }

    /// Whether this message ends its request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress { .. })
    }

    pub fn success(request_id: String, parsed: ParsedDocument) -> Self {
        WorkerMessage::Success {
            request_id,
            ast: parsed.ast,
            warnings: parsed.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let message = WorkerMessage::Progress {
            request_id: "parse-1".into(),
            progress: ParserProgress::parsing(10, 5, 50, "Streaming text chunks"),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["requestId"], "parse-1");
        assert_eq!(json["progress"]["phase"], "parsing");
        assert!(!message.is_terminal());

        let error = WorkerMessage::Error {
            request_id: "parse-2".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "boom");
        assert!(error.is_terminal());
        assert_eq!(error.request_id(), "parse-2");
    }

    #[test]
    fn test_request_round_trips_through_json() {
        let request = WorkerRequest::Parse {
            request_id: "parse-9".into(),
            file: SourceFile::from_bytes("a.txt", b"hi".to_vec()),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""type":"parse""#));
        let back: WorkerRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.request_id(), "parse-9");
    }
}
