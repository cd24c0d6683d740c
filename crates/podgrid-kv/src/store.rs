//! The pod-facing KV contract.
//!
//! [`PodStore`] is the slice of the cluster KV store the health
//! machinery and the replicator consume: listing a node's reality set,
//! writing intent for a host, and reading/writing per-service health
//! records. The real backend lives outside this repository; tests use
//! [`crate::fake::FakePodStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pod_core::{HealthState, Manifest, ManifestResult, NodeName, PodId};

use crate::error::KvResult;

/// Per-service health record, written by monitors under
/// `health/<node>/<service>` and read by health-gating callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthRecord {
    pub service: String,
    pub node: NodeName,
    pub id: PodId,
    pub status: HealthState,
    pub output: String,
}

/// Contracted KV operations over pods and their health.
///
/// Implementations must expose the backend's monotonic modify index on
/// every listed entry, and surface logical not-found as a typed error
/// distinct from transport failures.
#[async_trait]
pub trait PodStore: Send + Sync {
    /// List the manifests stored under a keyspace prefix (e.g. the
    /// `reality/<node>` prefix produced by [`pod_core::reality_path`]).
    async fn list_pods(&self, path: &str) -> KvResult<Vec<ManifestResult>>;

    /// Write the manifest to the host's intent set. Returns the modify
    /// index of the written entry.
    async fn write_intent(&self, host: &str, manifest: &Manifest) -> KvResult<u64>;

    /// Write a per-service health record under `health/<node>/<service>`.
    async fn put_health(&self, record: &HealthRecord) -> KvResult<()>;

    /// Read one service's health record back.
    async fn get_health(&self, node: &str, service: &str) -> KvResult<HealthRecord>;
}
