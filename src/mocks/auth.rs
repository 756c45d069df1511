//! Mock authentication provider for testing.

use crate::auth::AuthProvider;
use crate::errors::{IssueReportError, IssueReportResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Auth provider with a fixed token and call counters.
#[derive(Debug)]
pub struct MockAuthProvider {
    token: String,
    fail_reauthentication: AtomicBool,
    reauthentications: AtomicU32,
    invalidations: AtomicU32,
}

impl MockAuthProvider {
    /// Creates a provider handing out `Bearer <token>`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            fail_reauthentication: AtomicBool::new(false),
            reauthentications: AtomicU32::new(0),
            invalidations: AtomicU32::new(0),
        }
    }

    /// Makes every re-authentication fail with `AuthExpired`.
    pub fn failing_reauthentication(self) -> Self {
        self.fail_reauthentication.store(true, Ordering::SeqCst);
        self
    }

    /// Number of re-authentications performed.
    pub fn reauthentication_count(&self) -> u32 {
        self.reauthentications.load(Ordering::SeqCst)
    }

    /// Number of invalidations performed.
    pub fn invalidation_count(&self) -> u32 {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new("mock-token")
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn authorization_headers(&self) -> IssueReportResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| IssueReportError::configuration(e.to_string()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    async fn reauthenticate(&self) -> IssueReportResult<()> {
        self.reauthentications.fetch_add(1, Ordering::SeqCst);
        if self.fail_reauthentication.load(Ordering::SeqCst) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            return Err(IssueReportError::auth_expired("Access token invalid or expired"));
        }
        Ok(())
    }

    async fn invalidate(&self) -> IssueReportResult<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
