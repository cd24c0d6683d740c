//! Domain types shared across the podgrid crates.
//!
//! These types cross the KV wire as JSON, mirroring how every other
//! record in the cluster keyspace is stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identifier of one deployable pod.
pub type PodId = String;

/// Name of a node in the fleet, as recorded in the KV keyspace.
pub type NodeName = String;

// ── Manifest ──────────────────────────────────────────────────────

/// Declarative description of one pod, as read from a node's reality
/// set or written to a host's intent key.
///
/// The manifest format itself is owned by the front-end tooling; this
/// type carries only the fields the control plane core acts on, plus
/// an opaque payload preserved through serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Stable pod id, unique within a node's reality set.
    pub id: PodId,
    /// Port of the pod's status endpoint. Zero means the pod exposes
    /// no status endpoint and is never health-checked.
    #[serde(default)]
    pub status_port: u16,
    /// Probe the status endpoint over HTTPS instead of HTTP.
    #[serde(default)]
    pub status_https: bool,
    /// Remaining manifest content, carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, String>,
}

impl Manifest {
    /// Create a manifest with no status endpoint.
    pub fn new(id: impl Into<PodId>) -> Self {
        Self {
            id: id.into(),
            status_port: 0,
            status_https: false,
            payload: BTreeMap::new(),
        }
    }

    /// Create a manifest with a status endpoint on the given port.
    pub fn with_status_port(id: impl Into<PodId>, port: u16) -> Self {
        Self {
            id: id.into(),
            status_port: port,
            status_https: false,
            payload: BTreeMap::new(),
        }
    }

    /// Whether this pod exposes a status endpoint at all.
    pub fn has_status_endpoint(&self) -> bool {
        self.status_port != 0
    }
}

/// One entry from listing a node's reality set: the manifest plus the
/// modify index of its KV entry at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResult {
    pub manifest: Manifest,
    pub modify_index: u64,
}

// ── Health state ──────────────────────────────────────────────────

/// Health of one service as recorded in the KV store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Passing,
    Warning,
    Critical,
    #[default]
    Unknown,
}

impl HealthState {
    /// Whether this state satisfies a health gate.
    pub fn is_passing(&self) -> bool {
        matches!(self, HealthState::Passing)
    }
}
