//! Node health monitoring configuration.

use std::time::Duration;

use pod_core::NodeName;

use crate::error::HealthError;
use crate::{HEALTHCHECK_INTERVAL, POLL_KV_FOR_PODS, TTL};

/// Configuration for one node's health supervisor.
///
/// The intervals default to the cluster-wide constants; tests shrink
/// them to drive reconciliation quickly.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// The node whose reality set is reconciled. Also the host probed
    /// by every status check on this node.
    pub node: NodeName,
    /// Duration between reality store polls.
    pub poll_interval: Duration,
    /// Duration between health checks of one service.
    pub check_interval: Duration,
    /// Freshness window for an unchanged health record.
    pub ttl: Duration,
    /// Per-probe timeout. Must stay within `check_interval`, otherwise
    /// a stuck probe starves its monitor.
    pub probe_timeout: Duration,
}

impl MonitorConfig {
    pub fn new(node: impl Into<NodeName>) -> Self {
        Self {
            node: node.into(),
            poll_interval: POLL_KV_FOR_PODS,
            check_interval: HEALTHCHECK_INTERVAL,
            ttl: TTL,
            probe_timeout: HEALTHCHECK_INTERVAL,
        }
    }

    /// Build the HTTP client used by every probe on this node.
    pub fn build_probe_client(&self) -> Result<reqwest::Client, HealthError> {
        reqwest::Client::builder()
            .timeout(self.probe_timeout)
            .build()
            .map_err(|e| HealthError::Config(e.to_string()))
    }
}
