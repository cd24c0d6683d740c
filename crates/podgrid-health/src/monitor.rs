//! The per-pod monitor loop.
//!
//! One monitor task runs for as long as its pod stays in the node's
//! reality set. Every check interval it probes the status endpoint and
//! publishes the result, unless suppression says the record is still
//! fresh. Probe and publish failures are absorbed; the next tick
//! retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use podgrid_kv::PodStore;

use crate::checker::StatusCheck;

/// Run the probe loop for one service until shutdown.
pub(crate) async fn run_monitor(
    store: Arc<dyn PodStore>,
    mut check: StatusCheck,
    check_interval: Duration,
    ttl: Duration,
    mut shutdown: mpsc::Receiver<()>,
) {
    debug!(service = %check.service_id(), "health monitor starting");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(check_interval) => {
                check_health(store.as_ref(), &mut check, ttl).await;
            }
            _ = shutdown.recv() => {
                debug!(service = %check.service_id(), "health monitor shutting down");
                return;
            }
        }
    }
}

/// One probe-and-publish cycle.
async fn check_health(store: &dyn PodStore, check: &mut StatusCheck, ttl: Duration) {
    let probe = check.check().await;
    if !check.update_needed(probe.status, ttl) {
        return;
    }

    let record = check.to_record(&probe);
    match store.put_health(&record).await {
        // Suppression state only advances on a successful write.
        Ok(()) => check.record_published(probe.status),
        Err(e) => {
            warn!(
                service = %check.service_id(),
                node = %check.node(),
                error = %e,
                "failed to write health record"
            );
        }
    }
}
