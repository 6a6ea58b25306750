//! Snapshot persistence.
//!
//! The core never decides when or where to persist: it exposes
//! [`SessionSnapshot`](crate::SessionSnapshot)s and these backends, and the
//! host chooses the medium and cadence.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, LAST_SESSION_KEY, create_autosave_manager};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::BoxFuture;
use crate::snapshot::SessionSnapshot;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Snapshot not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot storage backends.
pub trait SnapshotStorage: Send + Sync {
    /// Save a snapshot under `id`.
    fn save(&self, id: &str, snapshot: &SessionSnapshot) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a snapshot.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<SessionSnapshot>>;

    /// Delete a snapshot. Deleting a missing id succeeds.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all snapshot ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a snapshot exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
