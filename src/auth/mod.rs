//! Authentication for the remote API.
//!
//! [`AuthSession`] owns the [`TokenStore`] and is the only component that
//! writes to it. It hands out bearer headers, refreshes the credential shortly
//! before it expires, and clears the store whenever the remote rejects the
//! refresh token.
//!
//! The executor only sees the [`AuthProvider`] trait, so it can be driven by a
//! mock in tests.

use crate::config::IssueReportConfig;
use crate::errors::{AuthenticationError, IssueReportError, IssueReportResult};
use crate::token::{Credential, TokenStore};
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Token endpoint path.
pub const TOKEN_PATH: &str = "authentication/v2/token";

/// Authorization endpoint path.
pub const AUTHORIZE_PATH: &str = "authentication/v2/authorize";

/// Refresh this many seconds before the access token expires.
pub const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 60;

/// Authentication provider abstraction used by the request executor.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current authorization headers, refreshing the credential if needed.
    async fn authorization_headers(&self) -> IssueReportResult<HeaderMap>;

    /// Recovers from a 401. Failures clear the credential and surface as `AuthExpired`.
    async fn reauthenticate(&self) -> IssueReportResult<()>;

    /// Drops the current credential unconditionally.
    async fn invalidate(&self) -> IssueReportResult<()>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth session backed by a [`TokenStore`].
pub struct AuthSession {
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn HttpTransport>,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scope: String,
    token_url: Url,
    authorize_url: Url,
    timeout: Duration,
    refresh_lock: Mutex<()>,
}

impl AuthSession {
    /// Creates a new session for the configured client.
    pub fn new(
        config: &IssueReportConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> IssueReportResult<Self> {
        Ok(Self {
            store,
            transport,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
            token_url: config.endpoint(TOKEN_PATH)?,
            authorize_url: config.endpoint(AUTHORIZE_PATH)?,
            timeout: config.timeout,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Returns a valid access token, refreshing it first when it is about to expire.
    pub async fn ensure_token(&self) -> IssueReportResult<SecretString> {
        let _guard = self.refresh_lock.lock().await;

        let credential = match self.store.latest().await? {
            Some(credential) => credential,
            None => {
                info!("No stored credential");
                return Err(AuthenticationError::Unauthenticated.into());
            }
        };

        if credential.expires_within(ChronoDuration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS)) {
            debug!(expires_at = %credential.expires_at, "Access token near expiry, refreshing");
            let refreshed = self.refresh_locked(&credential).await?;
            return Ok(refreshed.access_token);
        }

        Ok(credential.access_token)
    }

    /// Bearer authorization headers for the current credential.
    pub async fn headers(&self) -> IssueReportResult<HeaderMap> {
        let token = self.ensure_token().await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| AuthenticationError::InvalidToken(e.to_string()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Exchanges the refresh token of `credential` for a new credential.
    ///
    /// A rejected refresh clears the store. Transport failures leave it untouched.
    pub async fn refresh(&self, credential: &Credential) -> IssueReportResult<Credential> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(credential).await
    }

    async fn refresh_locked(&self, credential: &Credential) -> IssueReportResult<Credential> {
        let form = serde_urlencoded::to_string(RefreshRequest {
            grant_type: "refresh_token",
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            refresh_token: credential.refresh_token.expose_secret(),
            redirect_uri: &self.redirect_uri,
        })
        .map_err(|e| IssueReportError::configuration(format!("Invalid refresh form: {}", e)))?;

        info!("Refreshing access token");
        let request = HttpRequest::post_form(self.token_url.clone(), HeaderMap::new(), form)
            .with_timeout(self.timeout);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status.as_u16(), "Token refresh rejected");
            self.clear().await?;
            return Err(AuthenticationError::RefreshFailed(format!(
                "Token refresh failed with status {}: {}",
                response.status,
                response.text()
            ))
            .into());
        }

        let payload: TokenResponse = match serde_json::from_slice(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Token refresh returned an unreadable body");
                self.clear().await?;
                return Err(AuthenticationError::RefreshFailed(format!(
                    "Failed to parse response: {}",
                    e
                ))
                .into());
            }
        };

        let refresh_token = match payload.refresh_token {
            Some(token) => token,
            None => credential.refresh_token.expose_secret().clone(),
        };
        let refreshed = Credential::expiring_in(
            payload.access_token,
            refresh_token,
            payload.expires_in.unwrap_or(0),
        );
        self.store.replace(refreshed.clone()).await?;

        info!(expires_at = %refreshed.expires_at, "Access token refreshed");
        Ok(refreshed)
    }

    /// Clears every stored credential.
    pub async fn invalidate(&self) -> IssueReportResult<()> {
        self.clear().await
    }

    async fn clear(&self) -> IssueReportResult<()> {
        self.store.clear().await?;
        info!("Stored credentials cleared");
        Ok(())
    }

    /// Refresh triggered by a 401. Any failure clears the store and yields `AuthExpired`.
    pub async fn reauthenticate(&self) -> IssueReportResult<()> {
        let _guard = self.refresh_lock.lock().await;

        let credential = match self.store.latest().await? {
            Some(credential) => credential,
            None => {
                info!("Re-authentication impossible, no stored credential");
                self.clear().await?;
                return Err(IssueReportError::auth_expired(
                    "Access token invalid or expired",
                ));
            }
        };

        info!("Re-authenticating after 401");
        if let Err(e) = self.refresh_locked(&credential).await {
            warn!(error = %e, "Re-authentication failed");
            self.clear().await?;
            return Err(IssueReportError::auth_expired(
                "Access token invalid or expired",
            ));
        }
        Ok(())
    }

    /// URL the user is sent to in order to grant access.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope);
        url
    }

    /// Exchanges an authorization code and stores the resulting credential.
    pub async fn exchange_code(&self, code: &str) -> IssueReportResult<()> {
        let form = serde_urlencoded::to_string(CodeExchangeRequest {
            grant_type: "authorization_code",
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            code,
            redirect_uri: &self.redirect_uri,
        })
        .map_err(|e| IssueReportError::configuration(format!("Invalid exchange form: {}", e)))?;

        let request = HttpRequest::post_form(self.token_url.clone(), HeaderMap::new(), form)
            .with_timeout(self.timeout);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status.as_u16(), "Authorization code exchange rejected");
            return Err(AuthenticationError::AuthorizationFailed(response.text()).into());
        }

        let payload: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            AuthenticationError::AuthorizationFailed(format!("Failed to parse response: {}", e))
        })?;

        let credential = Credential::expiring_in(
            payload.access_token,
            payload.refresh_token.unwrap_or_default(),
            payload.expires_in.unwrap_or(0),
        );

        let _guard = self.refresh_lock.lock().await;
        self.store.clear().await?;
        self.store.replace(credential).await?;
        info!("Authorization code exchanged");
        Ok(())
    }

    /// Returns true when a credential exists and has not expired.
    pub async fn is_authenticated(&self) -> IssueReportResult<bool> {
        Ok(self
            .store
            .latest()
            .await?
            .map(|credential| !credential.is_expired())
            .unwrap_or(false))
    }
}

#[async_trait]
impl AuthProvider for AuthSession {
    async fn authorization_headers(&self) -> IssueReportResult<HeaderMap> {
        self.headers().await
    }

    async fn reauthenticate(&self) -> IssueReportResult<()> {
        AuthSession::reauthenticate(self).await
    }

    async fn invalidate(&self) -> IssueReportResult<()> {
        AuthSession::invalidate(self).await
    }
}
