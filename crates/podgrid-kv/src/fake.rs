//! In-memory fakes for the KV store traits.
//!
//! These are part of the public API so the other crates' test suites
//! can exercise the health and replication machinery without a real
//! KV backend. A single lock guards each fake's map and its modify
//! index; all operations take and release it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pod_core::{health_path, Manifest, ManifestResult, NodeName, PodId};

use crate::error::{KvError, KvResult};
use crate::status::{NamespaceStatuses, Status, StatusIdentifier, StatusStore, Txn};
use crate::store::{HealthRecord, PodStore};

/// Where the fake's modify index starts. Above zero so a
/// compare-and-swap against a missing key cannot pass by accident.
const INITIAL_INDEX: u64 = 1234;

// ── Status store fake ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StatusEntry {
    status: Status,
    modify_index: u64,
}

#[derive(Debug, Default)]
struct StatusInner {
    statuses: HashMap<StatusIdentifier, StatusEntry>,
    last_index: u64,
}

/// In-memory [`StatusStore`] with real compare-and-swap semantics.
///
/// The transactional operations are refused with
/// [`KvError::TxnUnsupported`]; tests that need them must run against
/// a transactional backend.
#[derive(Debug)]
pub struct FakeStatusStore {
    inner: Mutex<StatusInner>,
}

impl FakeStatusStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusInner {
                statuses: HashMap::new(),
                last_index: INITIAL_INDEX,
            }),
        }
    }

    /// The store-wide modify index.
    pub async fn last_index(&self) -> u64 {
        self.inner.lock().await.last_index
    }
}

impl Default for FakeStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for FakeStatusStore {
    async fn set(&self, id: &StatusIdentifier, status: Status) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.last_index += 1;
        let modify_index = inner.last_index;
        inner.statuses.insert(
            id.clone(),
            StatusEntry {
                status,
                modify_index,
            },
        );
        Ok(())
    }

    async fn cas(
        &self,
        id: &StatusIdentifier,
        status: Status,
        expected_index: u64,
    ) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        // An absent key has index zero for CAS purposes.
        let actual = inner
            .statuses
            .get(id)
            .map(|entry| entry.modify_index)
            .unwrap_or(0);
        if actual != expected_index {
            return Err(KvError::CasConflict {
                key: id.to_string(),
                expected: expected_index,
                actual,
            });
        }
        inner.last_index += 1;
        let modify_index = inner.last_index;
        inner.statuses.insert(
            id.clone(),
            StatusEntry {
                status,
                modify_index,
            },
        );
        Ok(())
    }

    async fn set_txn(
        &self,
        _txn: &mut Txn,
        _id: &StatusIdentifier,
        _status: Status,
    ) -> KvResult<()> {
        Err(KvError::TxnUnsupported("set_txn"))
    }

    async fn get(&self, id: &StatusIdentifier) -> KvResult<(Status, u64)> {
        let inner = self.inner.lock().await;
        match inner.statuses.get(id) {
            Some(entry) => Ok((entry.status.clone(), entry.modify_index)),
            // The backend returns its current index even on a miss, so
            // a follow-up CAS on the absent key can use zero.
            None => Err(KvError::NoStatus {
                key: id.to_string(),
                last_index: inner.last_index,
            }),
        }
    }

    async fn watch(&self, id: &StatusIdentifier, wait_index: u64) -> KvResult<(Status, u64)> {
        // Unblocks on any write advancing the store index, which admits
        // spurious early returns for unrelated keys. Callers re-check.
        loop {
            {
                let inner = self.inner.lock().await;
                if wait_index <= inner.last_index {
                    return match inner.statuses.get(id) {
                        Some(entry) => Ok((entry.status.clone(), entry.modify_index)),
                        None => Err(KvError::NoStatus {
                            key: id.to_string(),
                            last_index: inner.last_index,
                        }),
                    };
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn delete(&self, id: &StatusIdentifier) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        inner.statuses.remove(id);
        inner.last_index += 1;
        Ok(())
    }

    async fn delete_txn(&self, _txn: &mut Txn, _id: &StatusIdentifier) -> KvResult<()> {
        Err(KvError::TxnUnsupported("delete_txn"))
    }

    async fn get_all_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> KvResult<NamespaceStatuses> {
        let inner = self.inner.lock().await;
        let mut out = HashMap::new();
        for (id, entry) in &inner.statuses {
            if id.resource_type == resource_type && id.resource_id == resource_id {
                out.insert(id.namespace.clone(), entry.status.clone());
            }
        }
        Ok(out)
    }

    async fn get_all_for_resource_type(
        &self,
        resource_type: &str,
    ) -> KvResult<HashMap<String, NamespaceStatuses>> {
        let inner = self.inner.lock().await;
        let mut out: HashMap<String, NamespaceStatuses> = HashMap::new();
        for (id, entry) in &inner.statuses {
            if id.resource_type == resource_type {
                out.entry(id.resource_id.clone())
                    .or_default()
                    .insert(id.namespace.clone(), entry.status.clone());
            }
        }
        Ok(out)
    }
}

// ── Pod store fake ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PodInner {
    /// Listing prefix → entries, as `list_pods` would return them.
    pods: HashMap<String, Vec<ManifestResult>>,
    /// Intent writes in the exact order they arrived.
    intents: Vec<(NodeName, Manifest)>,
    health: HashMap<(NodeName, String), HealthRecord>,
    health_writes: HashMap<(NodeName, String), u64>,
    last_index: u64,
    fail_listings: bool,
    fail_intent_writes: bool,
}

/// In-memory [`PodStore`] that records intent-write order and
/// per-service health writes for assertions.
#[derive(Debug)]
pub struct FakePodStore {
    inner: Mutex<PodInner>,
}

impl FakePodStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PodInner {
                last_index: INITIAL_INDEX,
                ..Default::default()
            }),
        }
    }

    /// Replace the reality set listed under `reality/<node>`.
    pub async fn set_reality(&self, node: &str, manifests: Vec<Manifest>) {
        let mut inner = self.inner.lock().await;
        let entries = manifests
            .into_iter()
            .map(|manifest| {
                inner.last_index += 1;
                ManifestResult {
                    manifest,
                    modify_index: inner.last_index,
                }
            })
            .collect();
        inner.pods.insert(pod_core::reality_path(node), entries);
    }

    /// Make every subsequent `list_pods` fail with a transport error.
    pub async fn fail_listings(&self, fail: bool) {
        self.inner.lock().await.fail_listings = fail;
    }

    /// Make every subsequent `write_intent` fail with a transport error.
    pub async fn fail_intent_writes(&self, fail: bool) {
        self.inner.lock().await.fail_intent_writes = fail;
    }

    /// Intent writes so far, as `(host, pod id)` in arrival order.
    pub async fn intent_log(&self) -> Vec<(NodeName, PodId)> {
        self.inner
            .lock()
            .await
            .intents
            .iter()
            .map(|(host, manifest)| (host.clone(), manifest.id.clone()))
            .collect()
    }

    /// How many times `put_health` has been called for one service.
    pub async fn health_write_count(&self, node: &str, service: &str) -> u64 {
        self.inner
            .lock()
            .await
            .health_writes
            .get(&(node.to_string(), service.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl Default for FakePodStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PodStore for FakePodStore {
    async fn list_pods(&self, path: &str) -> KvResult<Vec<ManifestResult>> {
        let inner = self.inner.lock().await;
        if inner.fail_listings {
            return Err(KvError::Transport("injected listing failure".to_string()));
        }
        Ok(inner.pods.get(path).cloned().unwrap_or_default())
    }

    async fn write_intent(&self, host: &str, manifest: &Manifest) -> KvResult<u64> {
        let mut inner = self.inner.lock().await;
        if inner.fail_intent_writes {
            return Err(KvError::Transport("injected intent write failure".to_string()));
        }
        inner.last_index += 1;
        let index = inner.last_index;
        inner.intents.push((host.to_string(), manifest.clone()));
        Ok(index)
    }

    async fn put_health(&self, record: &HealthRecord) -> KvResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (record.node.clone(), record.service.clone());
        inner.health.insert(key.clone(), record.clone());
        *inner.health_writes.entry(key).or_insert(0) += 1;
        inner.last_index += 1;
        Ok(())
    }

    async fn get_health(&self, node: &str, service: &str) -> KvResult<HealthRecord> {
        let inner = self.inner.lock().await;
        inner
            .health
            .get(&(node.to_string(), service.to_string()))
            .cloned()
            .ok_or_else(|| KvError::NotFound(health_path(node, service)))
    }
}
