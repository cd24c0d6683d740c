//! Typed status facade over the KV store.
//!
//! Status records are opaque byte payloads keyed by
//! `(resource_type, resource_id, namespace)` and rendered on the wire
//! as `status/<type>/<id>/<namespace>`. Every record carries the
//! backend's monotonic modify index; compare-and-swap uses it for
//! optimistic concurrency.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::KvResult;

/// Total key into the status keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusIdentifier {
    pub resource_type: String,
    pub resource_id: String,
    pub namespace: String,
}

impl StatusIdentifier {
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for StatusIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status/{}/{}/{}",
            self.resource_type, self.resource_id, self.namespace
        )
    }
}

/// Opaque status payload. The store never interprets the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status(Vec<u8>);

impl Status {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Status {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// One pending operation in a transaction batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOp {
    Set {
        id: StatusIdentifier,
        status: Status,
    },
    Delete {
        id: StatusIdentifier,
    },
}

/// A caller-provided batch of status operations, committed atomically
/// by a transactional backend.
#[derive(Debug, Default)]
pub struct Txn {
    ops: Vec<TxnOp>,
}

impl Txn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations accumulated so far, in append order.
    pub fn ops(&self) -> &[TxnOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append an operation to the batch.
    pub fn push(&mut self, op: TxnOp) {
        self.ops.push(op);
    }
}

/// Status records grouped by namespace.
pub type NamespaceStatuses = HashMap<String, Status>;

/// The status store capability set.
///
/// Implementations are the real KV-backed store and the in-memory
/// [`crate::fake::FakeStatusStore`]; the fake refuses the transactional
/// operations with a typed error.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Unconditional write. Advances the modify index.
    async fn set(&self, id: &StatusIdentifier, status: Status) -> KvResult<()>;

    /// Atomic compare-and-swap. Succeeds iff `expected_index` equals
    /// the key's current modify index (zero for an absent key);
    /// otherwise fails with [`crate::KvError::CasConflict`] and no side
    /// effect.
    async fn cas(
        &self,
        id: &StatusIdentifier,
        status: Status,
        expected_index: u64,
    ) -> KvResult<()>;

    /// Append an unconditional set to a caller-provided transaction.
    async fn set_txn(
        &self,
        txn: &mut Txn,
        id: &StatusIdentifier,
        status: Status,
    ) -> KvResult<()>;

    /// Read a status record and its modify index. An absent key is
    /// [`crate::KvError::NoStatus`], which still carries the store's
    /// current index.
    async fn get(&self, id: &StatusIdentifier) -> KvResult<(Status, u64)>;

    /// Block until the key's modify index exceeds `wait_index`, then
    /// return the current record (or not-found, as with `get`).
    /// Spurious early returns are admitted; callers must re-check.
    async fn watch(&self, id: &StatusIdentifier, wait_index: u64) -> KvResult<(Status, u64)>;

    /// Delete the record. Advances the modify index.
    async fn delete(&self, id: &StatusIdentifier) -> KvResult<()>;

    /// Append a delete to a caller-provided transaction.
    async fn delete_txn(&self, txn: &mut Txn, id: &StatusIdentifier) -> KvResult<()>;

    /// All namespaces' statuses for one resource.
    async fn get_all_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> KvResult<NamespaceStatuses>;

    /// All resources of a type, each with all its namespaces' statuses.
    async fn get_all_for_resource_type(
        &self,
        resource_type: &str,
    ) -> KvResult<HashMap<String, NamespaceStatuses>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_renders_hierarchical_path() {
        let id = StatusIdentifier::new("pod_clusters", "web-east", "replication");
        assert_eq!(id.to_string(), "status/pod_clusters/web-east/replication");
    }

    #[test]
    fn status_byte_roundtrip() {
        let status = Status::from("deployed");
        assert_eq!(status.as_bytes(), b"deployed");
        assert_eq!(status.into_bytes(), b"deployed".to_vec());
    }

    #[test]
    fn txn_accumulates_in_order() {
        let mut txn = Txn::new();
        assert!(txn.is_empty());

        txn.push(TxnOp::Set {
            id: StatusIdentifier::new("t", "a", "ns"),
            status: Status::from("one"),
        });
        txn.push(TxnOp::Delete {
            id: StatusIdentifier::new("t", "b", "ns"),
        });

        assert_eq!(txn.len(), 2);
        assert!(matches!(txn.ops()[0], TxnOp::Set { .. }));
        assert!(matches!(txn.ops()[1], TxnOp::Delete { .. }));
    }
}
