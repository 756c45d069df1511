//! Token refresh and retry behaviour over HTTP.

use super::*;
use integrations_issue_report::errors::{AuthenticationError, TransportError};
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header};

const FOLDER: &str = "/data/v1/projects/p1/folders/f1";

fn folder_body() -> Value {
    json!({"data": {"id": "f1", "type": "folders", "attributes": {"displayName": "Plans"}}})
}

#[tokio::test]
async fn test_refresh_on_401_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FOLDER))
        .and(header("Authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FOLDER))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_token("old");
    let client = test_client(&server, store.clone());

    let folder = client.data().folder("p1", "f1").await.unwrap();
    assert_eq!(folder.attributes.display_or_name(), "Plans");

    let stored = store.latest().await.unwrap().unwrap();
    assert_eq!(stored.access_token.expose_secret(), "new");
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-2");
}

#[tokio::test]
async fn test_second_401_is_auth_expired_after_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FOLDER))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_token("old");
    let client = test_client(&server, store.clone());

    let result = client.data().folder("p1", "f1").await;

    assert!(matches!(
        result,
        Err(IssueReportError::Authentication(AuthenticationError::AuthExpired(_)))
    ));
    assert!(store.latest().await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_refresh_clears_credentials() {
    let server = MockServer::start().await;

    mount_status(&server, FOLDER, 401).await;
    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_with_token("old");
    let client = test_client(&server, store.clone());

    let error = client.data().folder("p1", "f1").await.unwrap_err();

    assert!(error.requires_reauthentication());
    assert!(store.latest().await.unwrap().is_none());
    assert!(!client.auth().is_authenticated().await.unwrap());
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_before_the_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FOLDER))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryTokenStore::with_credential(Credential::expiring_in(
        "about-to-expire",
        "refresh-1",
        30,
    )));
    let client = test_client(&server, store.clone());

    client.data().folder("p1", "f1").await.unwrap();

    let stored = store.latest().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.expose_secret(), "refresh-1");
}

#[tokio::test]
async fn test_server_errors_are_retried_with_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FOLDER))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FOLDER))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, store_with_token("token"));
    let folder = client.data().folder("p1", "f1").await.unwrap();
    assert_eq!(folder.id.as_deref(), Some("f1"));
}

#[tokio::test]
async fn test_rate_limit_exhaustion_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FOLDER))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_string("slow down"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server, store_with_token("token"));
    let error = client.data().folder("p1", "f1").await.unwrap_err();

    match error {
        IssueReportError::RemoteCallFailed { status, body, .. } => {
            assert_eq!(status.as_u16(), 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_timeouts_exhaust_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(FOLDER))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(folder_body())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = IssueReportConfig::builder()
        .base_url(server.uri())
        .client_id("client")
        .client_secret("secret")
        .redirect_uri("http://localhost:8000/auth/callback/")
        .max_retries(3)
        .backoff_base(Duration::ZERO)
        .backoff_max(Duration::ZERO)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = IssueReportClient::new(config, store_with_token("token")).unwrap();

    let result = client.data().folder("p1", "f1").await;
    assert!(matches!(
        result,
        Err(IssueReportError::Transport(TransportError::Timeout(_)))
    ));
}

#[tokio::test]
async fn test_authorization_code_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authentication/v2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "granted",
            "refresh_token": "refresh-9",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryTokenStore::new());
    let client = test_client(&server, store.clone());
    assert!(!client.auth().is_authenticated().await.unwrap());

    client.auth().exchange_code("abc123").await.unwrap();

    assert!(client.auth().is_authenticated().await.unwrap());
    let headers = client.headers().await.unwrap();
    assert_eq!(headers.get("authorization").unwrap(), "Bearer granted");
}
