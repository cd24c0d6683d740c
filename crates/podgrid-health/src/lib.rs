//! podgrid-health — per-node health monitoring.
//!
//! A node runs one long-lived [`HealthSupervisor`] that reconciles a
//! set of per-pod monitor tasks against the node's reality set in the
//! cluster KV store. Each monitor probes its pod's status endpoint on
//! an interval and publishes a health record, suppressing writes that
//! would only repeat fresh data.
//!
//! # Architecture
//!
//! ```text
//! HealthSupervisor (one per node)
//!   ├── polls reality/<node> every POLL_KV_FOR_PODS
//!   ├── diffs the listing against its monitor table
//!   └── per-pod monitor task (one per pod with a status endpoint)
//!         ├── StatusCheck probe every HEALTHCHECK_INTERVAL
//!         └── HealthRecord write, staleness-suppressed against TTL/4
//! ```

use std::time::Duration;

pub mod checker;
pub mod config;
pub mod error;
pub mod monitor;
pub mod supervisor;

pub use checker::{ProbeResult, StatusCheck};
pub use config::MonitorConfig;
pub use error::HealthError;
pub use supervisor::{monitor_pod_health, HealthSupervisor};

// These should probably all be something the operator can set in the
// node daemon config; the defaults match the rest of the cluster
// tooling.

/// Duration between reality store polls.
pub const POLL_KV_FOR_PODS: Duration = Duration::from_secs(3);

/// Duration between health checks of one service.
pub const HEALTHCHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Freshness window for a health record. Monitors refresh an
/// unchanged record after a quarter of this has elapsed.
pub const TTL: Duration = Duration::from_secs(60);
