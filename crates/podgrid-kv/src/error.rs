//! Error types for KV store operations.

use thiserror::Error;

/// Result type alias for KV store operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur against the cluster KV store.
#[derive(Debug, Error)]
pub enum KvError {
    /// No status record exists at the given key. Carries the store's
    /// current modify index so a follow-up compare-and-swap on the
    /// absent key can use an expected index of zero.
    #[error("no status record at {key} (store index {last_index})")]
    NoStatus { key: String, last_index: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's expected modify index is stale. Re-read and retry.
    #[error("compare-and-swap conflict on {key}: expected index {expected}, current {actual}")]
    CasConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// The backend cannot execute transactional operations.
    #[error("{0} requires a transactional KV backend")]
    TxnUnsupported(&'static str),

    #[error("transport error: {0}")]
    Transport(String),
}

impl KvError {
    /// Whether this is the typed not-found for a status key.
    pub fn is_no_status(&self) -> bool {
        matches!(self, KvError::NoStatus { .. })
    }

    /// Whether this is a stale compare-and-swap.
    pub fn is_cas_conflict(&self) -> bool {
        matches!(self, KvError::CasConflict { .. })
    }
}
