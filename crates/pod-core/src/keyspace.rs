//! KV keyspace layout.
//!
//! Every subsystem addresses the shared KV store through these paths:
//!
//! ```text
//! reality/<node>/<pod_id>              pods actually present on a node
//! intent/<host>/<pod_id>               desired state written by the replicator
//! health/<node>/<service>              per-service health records
//! status/<type>/<id>/<namespace>       opaque status payloads
//! ```

/// Prefix under which a node's reality set is listed.
pub fn reality_path(node: &str) -> String {
    format!("reality/{node}")
}

/// Prefix under which a host's intent set is written.
pub fn intent_path(host: &str) -> String {
    format!("intent/{host}")
}

/// Key of one service's health record on one node.
pub fn health_path(node: &str, service: &str) -> String {
    format!("health/{node}/{service}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        assert_eq!(reality_path("node1.example.com"), "reality/node1.example.com");
        assert_eq!(intent_path("h1"), "intent/h1");
        assert_eq!(health_path("h1", "web"), "health/h1/web");
    }
}
