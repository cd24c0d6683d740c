//! podgrid-replication — health-gated manifest rollout.
//!
//! A [`Replicator`] enacts one manifest across an ordered host set:
//! it writes the manifest to each host's intent key in turn, and waits
//! for the host's service to report passing before touching the next
//! host. At most one host is in transition at any time.
//!
//! # Components
//!
//! - **`checker`** — the [`HealthChecker`] gating seam and its
//!   KV-record-backed implementation
//! - **`replicator`** — the sequential rollout driver

pub mod checker;
pub mod error;
pub mod replicator;

pub use checker::{HealthChecker, RecordHealthChecker};
pub use error::{ReplicationError, ReplicationResult};
pub use replicator::{EnactOptions, Replicator};
