// ⚠️ Engine errors
//
// Formula and timestamp problems are recovered locally (zero / sentinel values).
// The only contract violation the engine raises itself is a structurally
// invalid entry; the rest of the variants belong to the store and importers.

use crate::entities::{EntryCategory, EntryLocation};
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type surfaced by the engine and its store.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An entry is missing a field needed to identify or label it.
    #[error("invalid {category} entry at {location}: missing {field}")]
    InvalidEntry {
        category: EntryCategory,
        location: EntryLocation,
        field: &'static str,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("import error: {0}")]
    Import(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(value: csv::Error) -> Self {
        Self::Import(value.to_string())
    }
}
