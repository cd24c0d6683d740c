//! Replication error types.

use thiserror::Error;

use podgrid_kv::KvError;

/// Result type alias for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that abort a replication run.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("failed to write intent for {host}: {source}")]
    IntentWrite {
        host: String,
        #[source]
        source: KvError,
    },

    #[error("health gate timed out waiting for {host} to pass")]
    HealthGateTimeout { host: String },
}
