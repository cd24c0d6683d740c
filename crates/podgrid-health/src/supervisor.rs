//! Node health supervisor — reconciles monitors against reality.
//!
//! The supervisor polls the node's reality set in the KV store and
//! keeps exactly one monitor task per listed pod with a status
//! endpoint: pods that disappear get their monitor shut down, pods
//! that appear get a fresh one. A failed listing keeps the current
//! monitor set untouched; a transient KV error must not tear down
//! live monitors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pod_core::{reality_path, PodId};
use podgrid_kv::PodStore;

use crate::checker::StatusCheck;
use crate::config::MonitorConfig;
use crate::error::HealthError;
use crate::monitor::run_monitor;

/// Per-pod monitor bookkeeping.
struct MonitorSlot {
    /// Shutdown signal for this monitor, delivered at most once.
    shutdown_tx: mpsc::Sender<()>,
    /// Handle to the monitor task.
    handle: JoinHandle<()>,
}

/// The per-node reconciler owning all of the node's monitors.
pub struct HealthSupervisor {
    config: MonitorConfig,
    store: Arc<dyn PodStore>,
    client: reqwest::Client,
    /// Supervised pods: pod id → slot. Only the run loop writes it.
    monitors: Arc<RwLock<HashMap<PodId, MonitorSlot>>>,
}

impl HealthSupervisor {
    /// Create a supervisor for the configured node.
    ///
    /// Fails only if the probe client cannot be built, which is fatal
    /// to health monitoring as a whole.
    pub fn new(config: MonitorConfig, store: Arc<dyn PodStore>) -> Result<Self, HealthError> {
        let client = config.build_probe_client()?;
        Ok(Self {
            config,
            store,
            client,
            monitors: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Run until `shutdown`. Reconciles once immediately, then on
    /// every poll interval. On shutdown, fans out to every monitor
    /// before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            node = %self.config.node,
            poll_interval = ?self.config.poll_interval,
            "health supervisor started"
        );

        self.reconcile().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.reconcile().await;
                }
                _ = shutdown.changed() => {
                    self.shutdown_all().await;
                    return;
                }
            }
        }
    }

    /// Ids of currently supervised pods.
    pub async fn active_pods(&self) -> Vec<PodId> {
        self.monitors.read().await.keys().cloned().collect()
    }

    /// Whether a pod currently has a monitor.
    pub async fn is_monitoring(&self, pod_id: &str) -> bool {
        self.monitors.read().await.contains_key(pod_id)
    }

    /// One reconciliation tick: list reality, stop monitors for pods
    /// that left, start monitors for pods that arrived with a status
    /// endpoint.
    async fn reconcile(&self) {
        let path = reality_path(&self.config.node);
        let listing = match self.store.list_pods(&path).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(node = %self.config.node, error = %e, "failed to list pods from reality store");
                return;
            }
        };

        let mut monitors = self.monitors.write().await;

        let listed: HashSet<&str> = listing
            .iter()
            .map(|result| result.manifest.id.as_str())
            .collect();

        let gone: Vec<PodId> = monitors
            .keys()
            .filter(|id| !listed.contains(id.as_str()))
            .cloned()
            .collect();
        for id in gone {
            if let Some(slot) = monitors.remove(&id) {
                let _ = slot.shutdown_tx.try_send(());
                slot.handle.abort();
                info!(service = %id, node = %self.config.node, "pod left reality set, monitor stopped");
            }
        }

        for result in listing {
            let manifest = result.manifest;
            if monitors.contains_key(&manifest.id) || !manifest.has_status_endpoint() {
                continue;
            }

            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            let check =
                StatusCheck::from_manifest(&self.config.node, &manifest, self.client.clone());
            let handle = tokio::spawn(run_monitor(
                self.store.clone(),
                check,
                self.config.check_interval,
                self.config.ttl,
                shutdown_rx,
            ));

            info!(
                service = %manifest.id,
                node = %self.config.node,
                port = manifest.status_port,
                "health monitor started"
            );
            monitors.insert(
                manifest.id.clone(),
                MonitorSlot {
                    shutdown_tx,
                    handle,
                },
            );
        }
    }

    /// Fan shutdown out to every monitor.
    async fn shutdown_all(&self) {
        let mut monitors = self.monitors.write().await;
        for (id, slot) in monitors.drain() {
            let _ = slot.shutdown_tx.try_send(());
            slot.handle.abort();
            debug!(service = %id, "health monitor stopped");
        }
        info!(node = %self.config.node, "health supervisor stopped");
    }
}

/// Track the node's reality set and manage a health monitor for each
/// service in it, until shutdown.
///
/// This is the node daemon's long-running entry point; the error case
/// is a startup configuration failure and fatal to health monitoring.
pub async fn monitor_pod_health(
    config: MonitorConfig,
    store: Arc<dyn PodStore>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), HealthError> {
    let supervisor = HealthSupervisor::new(config, store)?;
    supervisor.run(shutdown).await;
    Ok(())
}
