//! Integration tests using WireMock
//!
//! These tests drive the client through the real reqwest transport against a
//! mock HTTP server, covering token refresh, retries, folder traversal and
//! the full report aggregation.

mod report;
mod resilience;
mod tree;

use integrations_issue_report::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration pointing at the mock server, with instant backoff.
pub fn test_config(server: &MockServer) -> IssueReportConfig {
    IssueReportConfig::builder()
        .base_url(server.uri())
        .client_id("client")
        .client_secret("secret")
        .redirect_uri("http://localhost:8000/auth/callback/")
        .account_id("acct")
        .max_retries(3)
        .backoff_base(Duration::ZERO)
        .backoff_max(Duration::ZERO)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("valid test config")
}

/// Token store holding a credential valid for an hour.
pub fn store_with_token(token: &str) -> Arc<InMemoryTokenStore> {
    Arc::new(InMemoryTokenStore::with_credential(Credential::expiring_in(
        token, "refresh-1", 3600,
    )))
}

/// Client over the reqwest transport.
pub fn test_client(server: &MockServer, store: Arc<InMemoryTokenStore>) -> IssueReportClient {
    IssueReportClient::new(test_config(server), store).expect("client")
}

/// Mounts a GET returning `body` with status 200.
pub async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a GET returning an empty error body with `status`.
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
        .mount(server)
        .await;
}
