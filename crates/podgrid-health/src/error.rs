//! Error types for the health monitoring crate.

use thiserror::Error;

/// Errors fatal to health monitoring startup. Per-probe and per-tick
/// failures are absorbed by the monitor loops and never surface here.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("failed to build probe client: {0}")]
    Config(String),
}
