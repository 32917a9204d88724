//! Annotation persistence
//!
//! Annotations for one document live under a single key as a JSON array.
//! Storage is a convenience layer: reads degrade to an empty list and write
//! failures are logged, never returned.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use super::types::Annotation;

pub const STORAGE_KEY_PREFIX: &str = "universal-reader:annotations:";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing would exceed the store's byte quota
    #[error("Quota exceeded writing {key}: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { key: String, needed: usize, quota: usize },
}

/// String key-value backend
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store with an optional byte quota over keys plus values
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Filesystem store
// ============================================================================

/// One JSON file per key; the key is percent-encoded into the file name
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        // write-then-rename so readers never see a torn file
        let path = self.key_path(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================================================
// Annotation storage
// ============================================================================

pub fn storage_key(document_id: &str) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, document_id)
}

/// Loads and saves per-document annotation lists over a [`KeyValueStore`]
#[derive(Clone)]
pub struct AnnotationStorage {
    store: Arc<dyn KeyValueStore>,
}

impl AnnotationStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Stored annotations for `document_id`. Missing, unreadable or
    /// non-array payloads give an empty list; elements that fail to decode
    /// are skipped.
    pub async fn load_annotations(&self, document_id: &str) -> Vec<Annotation> {
        let key = storage_key(document_id);

        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(document_id = %document_id, error = %err, "Failed to read annotations");
                return Vec::new();
            }
        };

        let items = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!(document_id = %document_id, "Stored annotations are not an array, ignoring");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(document_id = %document_id, error = %err, "Stored annotations are corrupt, ignoring");
                return Vec::new();
            }
        };

        let total = items.len();
        let annotations: Vec<Annotation> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();

        if annotations.len() < total {
            tracing::debug!(
                document_id = %document_id,
                skipped = total - annotations.len(),
                "Skipped undecodable annotation records"
            );
        }

        annotations
    }

    /// Persist the full list for `document_id`. Failures are logged and
    /// otherwise ignored.
    pub async fn save_annotations(&self, document_id: &str, annotations: &[Annotation]) {
        if let Err(err) = self.try_save(document_id, annotations).await {
            tracing::warn!(
                document_id = %document_id,
                count = annotations.len(),
                error = %err,
                "Failed to persist annotations"
            );
        }
    }

    async fn try_save(&self, document_id: &str, annotations: &[Annotation]) -> Result<(), StorageError> {
        let payload = serde_json::to_string(annotations)?;
        self.store.set(&storage_key(document_id), &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::engine::{create_comment, create_pen};
    use crate::annotations::types::Point;

    fn sample(document_id: &str) -> Vec<Annotation> {
        vec![
            create_pen(document_id, 0, vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]),
            create_comment(document_id, 1, "note", Point::new(2.0, 2.0)),
        ]
    }

    #[tokio::test]
    async fn test_round_trip_and_missing_key() {
        let storage = AnnotationStorage::in_memory();
        assert!(storage.load_annotations("never").await.is_empty());

        let annotations = sample("doc-1");
        storage.save_annotations("doc-1", &annotations).await;
        assert_eq!(storage.load_annotations("doc-1").await, annotations);
        assert!(storage.load_annotations("doc-2").await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_payloads_degrade_to_empty() {
        let store = Arc::new(MemoryStore::new());
        let storage = AnnotationStorage::new(store.clone());

        store.set(&storage_key("bad"), "{not json").await.unwrap();
        assert!(storage.load_annotations("bad").await.is_empty());

        store.set(&storage_key("obj"), r#"{"id":"x"}"#).await.unwrap();
        assert!(storage.load_annotations("obj").await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_elements_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let storage = AnnotationStorage::new(store.clone());
        let good = sample("doc")[0].clone();

        let payload = format!("[{}, {{\"type\":\"laser\"}}, 42]", serde_json::to_string(&good).unwrap());
        store.set(&storage_key("doc"), &payload).await.unwrap();

        assert_eq!(storage.load_annotations("doc").await, vec![good]);
    }

    #[tokio::test]
    async fn test_quota_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::with_quota(64));
        let storage = AnnotationStorage::new(store.clone());

        storage.save_annotations("doc", &sample("doc")).await;
        assert!(store.is_empty());
        assert!(storage.load_annotations("doc").await.is_empty());

        let err = store.set("k", &"v".repeat(100)).await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 64, .. }));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let annotations = sample("doc/with:odd chars");

        let storage = AnnotationStorage::new(Arc::new(FileStore::new(dir.path())));
        storage.save_annotations("doc/with:odd chars", &annotations).await;

        let reopened = AnnotationStorage::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(reopened.load_annotations("doc/with:odd chars").await, annotations);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_missing_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("absent").await.unwrap(), None);
        store.remove("absent").await.unwrap();

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
