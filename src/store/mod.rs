//! Course record storage.
//!
//! # Data Flow
//! ```text
//! CatalogService
//!     → CourseStore trait
//!         → memory.rs (process-local, lost on restart)
//!         → json_file.rs (catalog persisted as a JSON array)
//! ```
//!
//! # Design Decisions
//! - The store assigns identifiers; callers hand over a draft
//! - Records are written whole under a write lock, never patched
//! - Every failure is a `StoreError`, nothing panics

pub mod json_file;
pub mod memory;

use std::sync::Arc;
use thiserror::Error;

use crate::catalog::types::{CourseDraft, CourseId, CourseRecord};
use crate::config::{StoreBackend, StoreConfig};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Failures raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage for course records.
pub trait CourseStore: Send + Sync {
    /// Persist a draft under a freshly issued identifier.
    fn create(&self, draft: CourseDraft) -> Result<CourseRecord, StoreError>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<CourseRecord>, StoreError>;

    fn get(&self, id: &CourseId) -> Result<Option<CourseRecord>, StoreError>;

    /// Remove a record, returning it if it existed.
    fn delete(&self, id: &CourseId) -> Result<Option<CourseRecord>, StoreError>;
}

/// Open the store selected by configuration.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn CourseStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::JsonFile => Ok(Arc::new(JsonFileStore::open(&config.path)?)),
    }
}
