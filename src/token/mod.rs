//! Credential storage.
//!
//! The store is a single-row cache: it holds at most one current credential,
//! which is replaced wholesale on every refresh and dropped entirely when the
//! remote rejects it. Persistence is left to implementors of [`TokenStore`].

use crate::errors::IssueReportResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tokio::sync::RwLock;

/// Access token, refresh token and absolute expiry, always written together.
#[derive(Clone)]
pub struct Credential {
    /// Bearer token sent with every request.
    pub access_token: SecretString,
    /// Token exchanged for a new access token.
    pub refresh_token: SecretString,
    /// Absolute expiry of the access token.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a new credential.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            expires_at,
        }
    }

    /// Creates a credential that expires `expires_in_secs` from now.
    ///
    /// Lifetimes beyond the representable range saturate.
    pub fn expiring_in(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Self {
        Self::new(access_token, refresh_token, expiry_after(expires_in_secs))
    }

    /// Checks if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Checks if the token is within `skew` of its expiry.
    pub fn expires_within(&self, skew: Duration) -> bool {
        self.expires_at
            .checked_sub_signed(skew)
            .map_or(skew > Duration::zero(), |deadline| deadline <= Utc::now())
    }
}

fn expiry_after(secs: i64) -> DateTime<Utc> {
    let now = Utc::now();
    Duration::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token storage interface.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the current credential, if any.
    async fn latest(&self) -> IssueReportResult<Option<Credential>>;

    /// Replaces the current credential.
    async fn replace(&self, credential: Credential) -> IssueReportResult<()>;

    /// Removes every stored credential.
    async fn clear(&self) -> IssueReportResult<()>;
}

/// In-memory token store.
#[derive(Default)]
pub struct InMemoryTokenStore {
    current: RwLock<Option<Credential>>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn latest(&self) -> IssueReportResult<Option<Credential>> {
        Ok(self.current.read().await.clone())
    }

    async fn replace(&self, credential: Credential) -> IssueReportResult<()> {
        *self.current.write().await = Some(credential);
        Ok(())
    }

    async fn clear(&self) -> IssueReportResult<()> {
        *self.current.write().await = None;
        Ok(())
    }
}
