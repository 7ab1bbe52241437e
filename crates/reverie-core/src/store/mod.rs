//! Insight Store
//!
//! The engine owns exactly one persisted collection: dreams. The contract
//! is deliberately narrow - load the whole collection, mutate in memory,
//! write the whole collection back - so a run's mutations hit disk all at
//! once or not at all. Backends behind [`DreamStore`]:
//!
//! - [`MemoryDreams`]: in-process, for tests and embedding callers
//! - [`SqliteStore`]: embedded SQLite, the default durable backend

mod migrations;
mod sqlite;

pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::SqliteStore;

use std::sync::RwLock;

use crate::dream::Dream;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Store error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// DREAM STORE CONTRACT
// ============================================================================

/// Load-all / write-all persistence for the dream collection
///
/// `replace` must be atomic: when it fails, the previously stored
/// collection stays intact and the caller discards its in-memory
/// mutations.
pub trait DreamStore: Send + Sync {
    /// The whole collection, in insertion order
    fn load(&self) -> Result<Vec<Dream>>;

    /// Atomically replace the whole collection
    fn replace(&self, dreams: &[Dream]) -> Result<()>;
}

// ============================================================================
// IN-MEMORY DREAMS
// ============================================================================

/// In-memory dream store
#[derive(Debug, Default)]
pub struct MemoryDreams {
    dreams: RwLock<Vec<Dream>>,
}

impl MemoryDreams {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DreamStore for MemoryDreams {
    fn load(&self) -> Result<Vec<Dream>> {
        let dreams = self
            .dreams
            .read()
            .map_err(|_| StoreError::Init("Dream lock poisoned".into()))?;
        Ok(dreams.clone())
    }

    fn replace(&self, dreams: &[Dream]) -> Result<()> {
        let mut stored = self
            .dreams
            .write()
            .map_err(|_| StoreError::Init("Dream lock poisoned".into()))?;
        *stored = dreams.to_vec();
        Ok(())
    }
}
