//! Annotations: pointer tools, gesture capture and per-document persistence

pub mod engine;
pub mod gesture;
pub mod store;
pub mod types;

pub use engine::{apply_pointer_tool, bounding_rect, create_comment, create_highlight, create_pen};
pub use gesture::GestureRecorder;
pub use store::{
    storage_key, AnnotationStorage, FileStore, KeyValueStore, MemoryStore, StorageError,
    STORAGE_KEY_PREFIX,
};
pub use types::{Annotation, AnnotationBody, AnnotationTool, Point, Rect};
