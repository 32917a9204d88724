//! Input documents
//!
//! A [`SourceFile`] is either an in-memory byte buffer or a path on disk.
//! Parsers read it whole or as a stream of fixed-size chunks; the chunked
//! reader never loads more than one chunk at a time for path-backed files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::ParseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceData {
    Memory { bytes: Arc<[u8]> },
    Path { path: PathBuf },
}

/// A document handed to the parser registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    /// MIME type reported by the host, if any
    pub mime_type: Option<String>,
    pub data: SourceData,
}

impl SourceFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into().into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: None,
            data: SourceData::Memory { bytes },
        }
    }

    /// Reference a file on disk; only its metadata is read here.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size: metadata.len(),
            mime_type: None,
            data: SourceData::Path {
                path: path.to_path_buf(),
            },
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        self.mime_type = (!mime_type.is_empty()).then_some(mime_type);
        self
    }

    /// Lowercase extension of the file name, if it has one
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }

    pub async fn read_all(&self) -> Result<Vec<u8>, ParseError> {
        match &self.data {
            SourceData::Memory { bytes } => Ok(bytes.to_vec()),
            SourceData::Path { path } => Ok(tokio::fs::read(path).await?),
        }
    }

    /// Whole contents decoded as UTF-8; invalid sequences become U+FFFD.
    pub async fn read_text(&self) -> Result<String, ParseError> {
        let bytes = self.read_all().await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    /// Stream the contents in chunks of at most `chunk_size` bytes.
    pub fn chunks(
        &self,
        chunk_size: usize,
    ) -> impl Stream<Item = Result<Vec<u8>, ParseError>> + Send + 'static {
        let chunk_size = chunk_size.max(1);
        let cursor = match &self.data {
            SourceData::Memory { bytes } => ChunkCursor::Memory {
                bytes: bytes.clone(),
                offset: 0,
            },
            SourceData::Path { path } => ChunkCursor::Unopened(path.clone()),
        };

        stream::unfold(cursor, move |cursor| async move {
            match cursor {
                ChunkCursor::Done => None,
                ChunkCursor::Memory { bytes, offset } => {
                    if offset >= bytes.len() {
                        return None;
                    }
                    let end = (offset + chunk_size).min(bytes.len());
                    let chunk = bytes[offset..end].to_vec();
                    Some((Ok(chunk), ChunkCursor::Memory { bytes, offset: end }))
                }
                ChunkCursor::Unopened(path) => match File::open(&path).await {
                    Ok(file) => read_file_chunk(file, chunk_size).await,
                    Err(err) => Some((Err(err.into()), ChunkCursor::Done)),
                },
                ChunkCursor::Open(file) => read_file_chunk(file, chunk_size).await,
            }
        })
    }
}

enum ChunkCursor {
    Memory { bytes: Arc<[u8]>, offset: usize },
    Unopened(PathBuf),
    Open(File),
    Done,
}

async fn read_file_chunk(
    mut file: File,
    chunk_size: usize,
) -> Option<(Result<Vec<u8>, ParseError>, ChunkCursor)> {
    let mut buffer = vec![0u8; chunk_size];
    let mut filled = 0;

    while filled < chunk_size {
        match file.read(&mut buffer[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) => return Some((Err(err.into()), ChunkCursor::Done)),
        }
    }

    if filled == 0 {
        return None;
    }
    buffer.truncate(filled);
    Some((Ok(buffer), ChunkCursor::Open(file)))
}
