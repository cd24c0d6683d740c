//! pod-core — shared domain types for the podgrid control plane.
//!
//! Defines the manifest and allocation types exchanged between the
//! replication driver and the per-node health machinery, the health
//! state vocabulary written to the cluster KV store, and the KV
//! keyspace path helpers.

pub mod allocation;
pub mod keyspace;
pub mod types;

pub use allocation::Allocation;
pub use keyspace::{health_path, intent_path, reality_path};
pub use types::{HealthState, Manifest, ManifestResult, NodeName, PodId};
