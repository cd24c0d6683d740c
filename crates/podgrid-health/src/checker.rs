//! Status endpoint probes and publish suppression.
//!
//! A [`StatusCheck`] probes one service's status endpoint and owns the
//! state that decides whether a probe result is worth publishing: an
//! unchanged status is only rewritten once a quarter of the record's
//! TTL has elapsed, which bounds the KV write rate while keeping the
//! record fresh.

use std::time::Duration;

use tokio::time::Instant;

use pod_core::{HealthState, Manifest, NodeName, PodId};
use podgrid_kv::HealthRecord;

/// Result of one probe of a status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: HealthState,
    pub output: String,
}

/// Probe state for one service on one node.
#[derive(Debug)]
pub struct StatusCheck {
    service_id: PodId,
    node: NodeName,
    uri: String,
    use_https: bool,
    client: reqwest::Client,

    // These decide whether a fresh result actually needs to be sent to
    // the KV store. If little time has passed and the status has not
    // changed there is no reason to rewrite the record.
    last_check: Option<Instant>,
    last_status: HealthState,
}

impl StatusCheck {
    /// Build the check for a manifest's status endpoint on `node`.
    pub fn from_manifest(node: &str, manifest: &Manifest, client: reqwest::Client) -> Self {
        Self {
            service_id: manifest.id.clone(),
            node: node.to_string(),
            uri: format!("{}:{}", node, manifest.status_port),
            use_https: manifest.status_https,
            client,
            last_check: None,
            last_status: HealthState::Unknown,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    /// Probe the endpoint once.
    ///
    /// Never fails: every outcome maps to a health state. A transport
    /// error is critical with the error text as output; a 2xx response
    /// is passing with the body as output; any other response is
    /// critical with the body as output. A body read failure after a
    /// good status line keeps the mapped status with empty output.
    pub async fn check(&self) -> ProbeResult {
        let scheme = if self.use_https { "https" } else { "http" };
        let url = format!("{scheme}://{}", self.uri);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                return ProbeResult {
                    status: HealthState::Critical,
                    output: e.to_string(),
                }
            }
        };

        let status = if response.status().is_success() {
            HealthState::Passing
        } else {
            HealthState::Critical
        };
        let output = response.text().await.unwrap_or_default();

        ProbeResult { status, output }
    }

    /// Whether a result with this status needs to be published.
    pub fn update_needed(&self, status: HealthState, ttl: Duration) -> bool {
        if self.last_status != status {
            return true;
        }
        match self.last_check {
            Some(last_check) => last_check.elapsed() > ttl / 4,
            None => true,
        }
    }

    /// Record a successful publish. A failed publish must not call
    /// this, so the next tick retries.
    pub fn record_published(&mut self, status: HealthState) {
        self.last_check = Some(Instant::now());
        self.last_status = status;
    }

    /// The health record for a probe result.
    pub fn to_record(&self, probe: &ProbeResult) -> HealthRecord {
        HealthRecord {
            service: self.service_id.clone(),
            node: self.node.clone(),
            id: self.service_id.clone(),
            status: probe.status,
            output: probe.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn test_check() -> StatusCheck {
        StatusCheck::from_manifest(
            "node1.example.com",
            &Manifest::with_status_port("web", 8080),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn uri_is_node_and_status_port() {
        let check = test_check();
        assert_eq!(check.uri, "node1.example.com:8080");
        assert!(!check.use_https);
        assert_eq!(check.service_id(), "web");
        assert_eq!(check.node(), "node1.example.com");
    }

    #[test]
    fn https_flag_carries_over() {
        let mut manifest = Manifest::with_status_port("web", 8443);
        manifest.status_https = true;
        let check = StatusCheck::from_manifest("node1", &manifest, reqwest::Client::new());
        assert!(check.use_https);
    }

    #[test]
    fn first_result_always_needs_publishing() {
        let check = test_check();
        assert!(check.update_needed(HealthState::Unknown, TTL));
        assert!(check.update_needed(HealthState::Passing, TTL));
    }

    #[test]
    fn status_change_needs_publishing() {
        let mut check = test_check();
        check.record_published(HealthState::Passing);
        assert!(check.update_needed(HealthState::Critical, TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_status_is_suppressed_within_quarter_ttl() {
        let mut check = test_check();
        check.record_published(HealthState::Passing);

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert!(!check.update_needed(HealthState::Passing, TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_status_republishes_after_quarter_ttl() {
        let mut check = test_check();
        check.record_published(HealthState::Passing);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(check.update_needed(HealthState::Passing, TTL));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_critical_with_error_text() {
        // Port 1 won't be listening.
        let check = StatusCheck::from_manifest(
            "127.0.0.1",
            &Manifest::with_status_port("web", 1),
            reqwest::Client::new(),
        );
        let probe = check.check().await;
        assert_eq!(probe.status, HealthState::Critical);
        assert!(!probe.output.is_empty());
    }

    #[test]
    fn record_carries_service_node_and_output() {
        let check = test_check();
        let record = check.to_record(&ProbeResult {
            status: HealthState::Passing,
            output: "ok".to_string(),
        });
        assert_eq!(record.service, "web");
        assert_eq!(record.id, "web");
        assert_eq!(record.node, "node1.example.com");
        assert_eq!(record.status, HealthState::Passing);
        assert_eq!(record.output, "ok");
    }
}
