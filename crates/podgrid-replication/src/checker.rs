//! Health observation seam for the replicator.

use std::sync::Arc;

use async_trait::async_trait;

use pod_core::HealthState;
use podgrid_kv::{KvError, KvResult, PodStore};

/// How the replicator observes a host's service health.
///
/// The production implementation reads the per-service records the
/// node monitors publish; tests substitute a programmable fake.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Current health of `service` on `node`. A service with no
    /// recorded health yet is `Unknown`, not an error.
    async fn service_health(&self, node: &str, service: &str) -> KvResult<HealthState>;
}

/// [`HealthChecker`] backed by the health records under
/// `health/<node>/<service>`.
pub struct RecordHealthChecker {
    store: Arc<dyn PodStore>,
}

impl RecordHealthChecker {
    pub fn new(store: Arc<dyn PodStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthChecker for RecordHealthChecker {
    async fn service_health(&self, node: &str, service: &str) -> KvResult<HealthState> {
        match self.store.get_health(node, service).await {
            Ok(record) => Ok(record.status),
            Err(KvError::NotFound(_)) => Ok(HealthState::Unknown),
            Err(e) => Err(e),
        }
    }
}
