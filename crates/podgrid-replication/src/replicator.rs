//! The sequential rollout driver.
//!
//! Enactment walks the allocation in order. For each host it writes
//! the manifest to the host's intent key, then polls the health
//! checker until the service reports passing before moving on. The
//! stop signal abandons the remaining hosts without error;
//! already-written hosts stay deployed, and re-running the same
//! enactment is safe because intent is idempotent by manifest content.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use pod_core::{Allocation, Manifest};
use podgrid_kv::PodStore;

use crate::checker::HealthChecker;
use crate::error::{ReplicationError, ReplicationResult};

/// Health-gate tuning for one enactment.
#[derive(Debug, Clone)]
pub struct EnactOptions {
    /// How often the gate re-reads a host's health.
    pub health_poll_interval: Duration,
    /// Give up on a host that has not passed within this window.
    /// `None` waits indefinitely (or until the stop signal).
    pub health_timeout: Option<Duration>,
}

impl Default for EnactOptions {
    fn default() -> Self {
        Self {
            health_poll_interval: Duration::from_secs(1),
            health_timeout: None,
        }
    }
}

enum GateOutcome {
    Passing,
    Stopped,
    TimedOut,
}

/// Drives the rollout of one manifest across an ordered host set.
pub struct Replicator {
    manifest: Manifest,
    allocation: Allocation,
}

impl Replicator {
    pub fn new(manifest: Manifest, allocation: Allocation) -> Self {
        Self {
            manifest,
            allocation,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Enact the manifest host by host, gated on health.
    ///
    /// Returns an error on an intent-write failure or a health-gate
    /// timeout; returns `Ok` when every host has been enacted or the
    /// stop signal arrived first.
    pub async fn enact(
        &self,
        store: &dyn PodStore,
        checker: &dyn HealthChecker,
        options: EnactOptions,
        mut stop: watch::Receiver<bool>,
    ) -> ReplicationResult<()> {
        info!(
            service = %self.manifest.id,
            hosts = self.allocation.len(),
            "replication starting"
        );

        for host in &self.allocation {
            if *stop.borrow() {
                info!(service = %self.manifest.id, "replication stopped, abandoning remaining hosts");
                return Ok(());
            }

            store
                .write_intent(host, &self.manifest)
                .await
                .map_err(|source| ReplicationError::IntentWrite {
                    host: host.clone(),
                    source,
                })?;
            info!(host = %host, service = %self.manifest.id, "intent written");

            match self.await_passing(host, checker, &options, &mut stop).await {
                GateOutcome::Passing => {
                    debug!(host = %host, service = %self.manifest.id, "host passed health gate");
                }
                GateOutcome::Stopped => {
                    info!(service = %self.manifest.id, "replication stopped, abandoning remaining hosts");
                    return Ok(());
                }
                GateOutcome::TimedOut => {
                    return Err(ReplicationError::HealthGateTimeout { host: host.clone() });
                }
            }
        }

        info!(
            service = %self.manifest.id,
            hosts = self.allocation.len(),
            "replication complete"
        );
        Ok(())
    }

    /// Poll the checker until the host's service passes, the stop
    /// signal arrives, or the gate times out. Check failures are
    /// transient: logged and retried on the next poll.
    async fn await_passing(
        &self,
        host: &str,
        checker: &dyn HealthChecker,
        options: &EnactOptions,
        stop: &mut watch::Receiver<bool>,
    ) -> GateOutcome {
        let deadline = options
            .health_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        loop {
            match checker.service_health(host, &self.manifest.id).await {
                Ok(state) if state.is_passing() => return GateOutcome::Passing,
                Ok(state) => {
                    debug!(host = %host, service = %self.manifest.id, ?state, "waiting for service to pass");
                }
                Err(e) => {
                    warn!(host = %host, service = %self.manifest.id, error = %e, "health check failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(options.health_poll_interval) => {}
                changed = stop.changed() => {
                    // A dropped sender counts as a stop.
                    if changed.is_err() || *stop.borrow() {
                        return GateOutcome::Stopped;
                    }
                }
                _ = deadline_sleep(deadline) => return GateOutcome::TimedOut,
            }
        }
    }
}

async fn deadline_sleep(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pod_core::HealthState;
    use podgrid_kv::{FakePodStore, KvResult};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Programmable checker: hosts report what the test sets, and
    /// `Unknown` until then.
    #[derive(Default)]
    struct FakeChecker {
        states: Mutex<HashMap<String, HealthState>>,
    }

    impl FakeChecker {
        async fn set(&self, host: &str, state: HealthState) {
            self.states.lock().await.insert(host.to_string(), state);
        }
    }

    #[async_trait]
    impl HealthChecker for FakeChecker {
        async fn service_health(&self, node: &str, _service: &str) -> KvResult<HealthState> {
            Ok(self
                .states
                .lock()
                .await
                .get(node)
                .copied()
                .unwrap_or_default())
        }
    }

    fn fast_options() -> EnactOptions {
        EnactOptions {
            health_poll_interval: Duration::from_millis(5),
            health_timeout: None,
        }
    }

    fn replicator() -> Replicator {
        Replicator::new(
            Manifest::with_status_port("web", 8080),
            Allocation::new(["h1", "h2", "h3"]),
        )
    }

    #[tokio::test]
    async fn enacts_hosts_strictly_in_allocation_order() {
        let store = FakePodStore::new();
        let checker = FakeChecker::default();
        for host in ["h1", "h2", "h3"] {
            checker.set(host, HealthState::Passing).await;
        }

        let (_stop_tx, stop_rx) = watch::channel(false);
        replicator()
            .enact(&store, &checker, fast_options(), stop_rx)
            .await
            .unwrap();

        assert_eq!(
            store.intent_log().await,
            vec![
                ("h1".to_string(), "web".to_string()),
                ("h2".to_string(), "web".to_string()),
                ("h3".to_string(), "web".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn stop_during_health_gate_abandons_remaining_hosts() {
        let store = Arc::new(FakePodStore::new());
        let checker = Arc::new(FakeChecker::default());
        let (stop_tx, stop_rx) = watch::channel(false);

        let enact = {
            let store = store.clone();
            let checker = checker.clone();
            tokio::spawn(async move {
                replicator()
                    .enact(store.as_ref(), checker.as_ref(), fast_options(), stop_rx)
                    .await
            })
        };

        // h1's intent lands, then the gate holds while h1 is unknown.
        while store.intent_log().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        stop_tx.send(true).unwrap();

        enact.await.unwrap().unwrap();
        assert_eq!(
            store.intent_log().await,
            vec![("h1".to_string(), "web".to_string())]
        );
    }

    #[tokio::test]
    async fn stop_before_start_writes_nothing() {
        let store = FakePodStore::new();
        let checker = FakeChecker::default();
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).unwrap();

        replicator()
            .enact(&store, &checker, fast_options(), stop_rx)
            .await
            .unwrap();
        assert!(store.intent_log().await.is_empty());
    }

    #[tokio::test]
    async fn health_gate_timeout_names_the_stuck_host() {
        let store = FakePodStore::new();
        let checker = FakeChecker::default();
        checker.set("h1", HealthState::Critical).await;

        let options = EnactOptions {
            health_poll_interval: Duration::from_millis(5),
            health_timeout: Some(Duration::from_millis(50)),
        };
        let (_stop_tx, stop_rx) = watch::channel(false);

        let err = replicator()
            .enact(&store, &checker, options, stop_rx)
            .await
            .unwrap_err();
        match err {
            ReplicationError::HealthGateTimeout { host } => assert_eq!(host, "h1"),
            other => panic!("expected HealthGateTimeout, got {other:?}"),
        }
        // h1 stays written; nothing further was attempted.
        assert_eq!(store.intent_log().await.len(), 1);
    }

    #[tokio::test]
    async fn intent_write_failure_aborts_the_run() {
        let store = FakePodStore::new();
        store.fail_intent_writes(true).await;
        let checker = FakeChecker::default();

        let (_stop_tx, stop_rx) = watch::channel(false);
        let err = replicator()
            .enact(&store, &checker, fast_options(), stop_rx)
            .await
            .unwrap_err();
        match err {
            ReplicationError::IntentWrite { host, .. } => assert_eq!(host, "h1"),
            other => panic!("expected IntentWrite, got {other:?}"),
        }
        assert!(store.intent_log().await.is_empty());
    }

    #[tokio::test]
    async fn gate_opens_when_health_arrives_late() {
        let store = Arc::new(FakePodStore::new());
        let checker = Arc::new(FakeChecker::default());
        checker.set("h2", HealthState::Passing).await;
        checker.set("h3", HealthState::Passing).await;

        let (_stop_tx, stop_rx) = watch::channel(false);
        let enact = {
            let store = store.clone();
            let checker = checker.clone();
            tokio::spawn(async move {
                replicator()
                    .enact(store.as_ref(), checker.as_ref(), fast_options(), stop_rx)
                    .await
            })
        };

        while store.intent_log().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        // h1 was warning for a while, then recovers.
        checker.set("h1", HealthState::Warning).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        checker.set("h1", HealthState::Passing).await;

        enact.await.unwrap().unwrap();
        assert_eq!(store.intent_log().await.len(), 3);
    }

    #[tokio::test]
    async fn empty_allocation_is_a_no_op() {
        let store = FakePodStore::new();
        let checker = FakeChecker::default();
        let replicator = Replicator::new(
            Manifest::with_status_port("web", 8080),
            Allocation::new(Vec::<String>::new()),
        );

        let (_stop_tx, stop_rx) = watch::channel(false);
        replicator
            .enact(&store, &checker, fast_options(), stop_rx)
            .await
            .unwrap();
        assert!(store.intent_log().await.is_empty());
    }
}
