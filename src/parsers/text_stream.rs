//! Streaming plain-text parser
//!
//! Reads the source in fixed-size chunks so that very large logs and text
//! dumps never sit in memory twice. Each chunk is decoded incrementally (a
//! multi-byte UTF-8 sequence split across chunks is carried into the next
//! one), complete lines become paragraphs, and the partial trailing line is
//! buffered until the next chunk arrives. The task yields to the scheduler
//! after every chunk.

use std::pin::pin;

use futures::StreamExt;

use crate::ast::{self, BlockNode, DocumentFormat};

use super::sanitize::sanitize_text;
use super::{
    parsing_percent, Assembly, ParseContext, ParseError, ParsedDocument, ParserProgress,
    SourceFile, TextStats,
};

const MIB: u64 = 1024 * 1024;

/// Incremental UTF-8 decoder; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode as much of `chunk` as possible, holding back an incomplete
    /// trailing sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is still pending at end of input
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

struct LineCollector {
    blocks: Vec<BlockNode>,
    stats: TextStats,
}

impl LineCollector {
    fn push_line(&mut self, line: &str) {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return;
        }
        self.stats.record(line);
        self.blocks.push(ast::paragraph(line));
    }
}

/// Parse a plain-text file chunk by chunk
pub async fn parse_text_stream(
    file: &SourceFile,
    context: &ParseContext,
) -> Result<ParsedDocument, ParseError> {
    let chunk_size = context.options.chunk_size_bytes;
    let mut warnings = Vec::new();

    if file.size > context.options.large_file_warning_bytes {
        tracing::warn!(
            file = %file.name,
            size = file.size,
            "Text file exceeds large-file threshold"
        );
        warnings.push(format!(
            "File size exceeds {}MB target, performance may degrade depending on available memory.",
            context.options.large_file_warning_bytes / MIB
        ));
    }

    let mut decoder = Utf8ChunkDecoder::default();
    let mut collector = LineCollector {
        blocks: Vec::new(),
        stats: TextStats::default(),
    };
    let mut carry = String::new();
    let mut loaded: u64 = 0;

    let mut chunks = pin!(file.chunks(chunk_size));
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        loaded += chunk.len() as u64;

        carry.push_str(&sanitize_text(&decoder.decode(&chunk)));
        if let Some(last_newline) = carry.rfind('\n') {
            let partial = carry.split_off(last_newline + 1);
            for line in carry.split('\n') {
                collector.push_line(line);
            }
            carry = partial;
        }

        context.report(ParserProgress::parsing(
            parsing_percent(loaded, file.size),
            loaded,
            file.size,
            "Streaming text chunks",
        ));

        tokio::task::yield_now().await;
    }

    carry.push_str(&sanitize_text(&decoder.finish()));
    for line in carry.split('\n') {
        collector.push_line(line);
    }

    tracing::debug!(
        file = %file.name,
        bytes = loaded,
        paragraphs = collector.blocks.len(),
        "Streamed text file"
    );

    Ok(Assembly {
        file,
        context,
        format: context.format_or(DocumentFormat::Txt),
        default_mime: "text/plain",
        section_title: "Body",
        stats: collector.stats,
        warnings,
        global_metadata: vec![
            ("parser", "streaming-txt-v1".to_string()),
            ("chunk-size", chunk_size.to_string()),
        ],
        done_message: "Text AST completed",
    }
    .finish(collector.blocks))
}
