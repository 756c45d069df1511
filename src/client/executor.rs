//! Request executor with auth, resilience, and error handling.

use crate::auth::AuthProvider;
use crate::config::IssueReportConfig;
use crate::errors::{IssueReportError, IssueReportResult};
use crate::resilience::{
    is_retryable_status, AttemptOutcome, RetryDecision, RetryPolicy, RetryState,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Request executor that wraps every remote call in the retry/re-authentication state machine.
///
/// Per logical call:
/// - transport failures are retried with backoff until the attempt budget is spent, then propagated
/// - a 401 triggers one re-authentication followed by one more attempt; a second 401 is returned
/// - 429 and 5xx are retried with backoff, honouring `Retry-After`; the last one is returned
/// - every other status is returned immediately
pub struct RequestExecutor {
    config: IssueReportConfig,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
    retry: RetryPolicy,
    user_agent: HeaderValue,
}

impl RequestExecutor {
    /// Creates a new request executor.
    pub fn new(
        config: IssueReportConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
    ) -> IssueReportResult<Self> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| IssueReportError::configuration(format!("Invalid user agent: {}", e)))?;
        Ok(Self {
            retry: config.retry_policy(),
            config,
            transport,
            auth,
            user_agent,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IssueReportConfig {
        &self.config
    }

    /// Builds a full URL from an already-encoded path.
    pub fn endpoint(&self, path: &str) -> IssueReportResult<Url> {
        self.config.endpoint(path)
    }

    /// Runs one logical call. `build` receives fresh headers for every attempt.
    pub async fn execute<F>(&self, build: F) -> IssueReportResult<HttpResponse>
    where
        F: Fn(HeaderMap) -> HttpRequest + Send + Sync,
    {
        let mut state = RetryState::new();

        loop {
            let mut headers = self.auth.authorization_headers().await?;
            headers.insert(USER_AGENT, self.user_agent.clone());
            let request = build(headers).with_timeout(self.config.timeout);

            let result = self.transport.send(request).await;
            let outcome = match &result {
                Ok(response) => AttemptOutcome::Response {
                    status: response.status,
                    retry_after: response
                        .headers
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                },
                Err(_) => AttemptOutcome::TransportFailure,
            };
            let decision = self.retry.decide(&state, &outcome);

            match (decision, result) {
                (RetryDecision::Retry(delay), result) => {
                    debug!(
                        attempt = state.attempt,
                        backoff_ms = delay.as_millis() as u64,
                        status = result.as_ref().ok().map(|r| r.status.as_u16()),
                        "Retrying request after backoff"
                    );
                    sleep(delay).await;
                    state.attempt += 1;
                }
                (RetryDecision::ReauthenticateAndRetry, _) => {
                    info!(attempt = state.attempt, "Received 401, re-authenticating");
                    self.auth.reauthenticate().await?;
                    state.reauthenticated = true;
                }
                (RetryDecision::Return | RetryDecision::Fail, Ok(response)) => {
                    if is_retryable_status(response.status) {
                        warn!(
                            attempt = state.attempt,
                            status = response.status.as_u16(),
                            "Retry budget exhausted"
                        );
                    }
                    return Ok(response);
                }
                (RetryDecision::Return | RetryDecision::Fail, Err(error)) => {
                    warn!(attempt = state.attempt, error = %error, "Retry budget exhausted");
                    return Err(error.into());
                }
            }
        }
    }

    /// GET through the state machine. A final 401 invalidates the session and yields `AuthExpired`.
    pub async fn get(&self, url: &Url) -> IssueReportResult<HttpResponse> {
        let response = self
            .execute(|headers| HttpRequest::get(url.clone(), headers))
            .await?;
        debug!(method = "GET", url = %url, status = response.status.as_u16(), "Request completed");

        if response.status == StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await?;
            info!(url = %url, "Access token rejected after re-authentication");
            return Err(IssueReportError::auth_expired("Access token invalid or expired"));
        }
        Ok(response)
    }

    /// GET and decode the JSON body; non-2xx becomes `RemoteCallFailed` for `operation`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        operation: &str,
    ) -> IssueReportResult<T> {
        let response = self.get(url).await?;
        if !response.is_success() {
            warn!(operation, status = response.status.as_u16(), "Remote call failed");
            return Err(IssueReportError::remote_call(
                operation,
                response.status,
                response.text(),
            ));
        }
        response.json()
    }

    /// GET and decode the JSON body; non-2xx yields `None`.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> IssueReportResult<Option<T>> {
        let response = self.get(url).await?;
        if !response.is_success() {
            debug!(
                url = %url,
                status = response.status.as_u16(),
                "Optional lookup returned no data"
            );
            return Ok(None);
        }
        response.json().map(Some)
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
