//! Configuration for the issue report client.

use crate::errors::{ConfigurationError, IssueReportError, IssueReportResult};
use crate::resilience::{BackoffPolicy, RetryPolicy};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Default OAuth scope.
pub const DEFAULT_SCOPE: &str = "account:read data:read bucket:read user:read";

/// Default report target.
pub const DEFAULT_PROJECT_NAME: &str = "DEV TASK 1 Project";

/// Environment variable names read by [`IssueReportConfig::from_env`].
pub mod env {
    /// API host.
    pub const BASE_URL: &str = "ISSUE_REPORT_BASE_URL";
    /// OAuth client id.
    pub const CLIENT_ID: &str = "ISSUE_REPORT_CLIENT_ID";
    /// OAuth client secret.
    pub const CLIENT_SECRET: &str = "ISSUE_REPORT_CLIENT_SECRET";
    /// OAuth redirect URI.
    pub const CALLBACK_URL: &str = "ISSUE_REPORT_CALLBACK_URL";
    /// OAuth scope.
    pub const SCOPE: &str = "ISSUE_REPORT_SCOPE";
    /// Account id backing the hub id.
    pub const ACCOUNT_ID: &str = "ISSUE_REPORT_ACCOUNT_ID";
    /// Report target project name.
    pub const PROJECT_NAME: &str = "ISSUE_REPORT_PROJECT_NAME";
    /// Per-request timeout in seconds.
    pub const TIMEOUT_SECS: &str = "ISSUE_REPORT_TIMEOUT_SECS";
    /// Attempt budget for retryable failures.
    pub const MAX_RETRIES: &str = "ISSUE_REPORT_MAX_RETRIES";
    /// Backoff base in milliseconds.
    pub const BACKOFF_BASE_MS: &str = "ISSUE_REPORT_BACKOFF_BASE_MS";
    /// Backoff cap in milliseconds.
    pub const BACKOFF_MAX_MS: &str = "ISSUE_REPORT_BACKOFF_MAX_MS";
}

/// Configuration for the issue report client.
#[derive(Clone)]
pub struct IssueReportConfig {
    /// API host; every endpoint path is appended to it.
    pub base_url: Url,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// OAuth redirect URI registered for the client.
    pub redirect_uri: String,
    /// OAuth scope requested at authorization time.
    pub scope: String,
    /// Account id; the hub id is derived from it.
    pub account_id: Option<String>,
    /// Name of the project the report is built for.
    pub project_name: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Attempt budget for transport errors, 429 and 5xx.
    pub max_retries: u32,
    /// Backoff base.
    pub backoff_base: Duration,
    /// Backoff cap.
    pub backoff_max: Duration,
    /// Page size for offset-paginated issue listings.
    pub issues_page_size: u32,
    /// User agent string.
    pub user_agent: String,
}

impl IssueReportConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> IssueReportConfigBuilder {
        IssueReportConfigBuilder::new()
    }

    /// Creates a configuration from `ISSUE_REPORT_*` environment variables.
    pub fn from_env() -> IssueReportResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| {
                IssueReportError::Configuration(ConfigurationError::MissingSetting(format!(
                    "{} environment variable not set",
                    name
                )))
            })
        };

        let mut builder = IssueReportConfigBuilder::new()
            .client_id(required(env::CLIENT_ID)?)
            .client_secret(required(env::CLIENT_SECRET)?)
            .redirect_uri(required(env::CALLBACK_URL)?);

        if let Ok(base_url) = std::env::var(env::BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Ok(scope) = std::env::var(env::SCOPE) {
            builder = builder.scope(scope);
        }
        if let Ok(account_id) = std::env::var(env::ACCOUNT_ID) {
            if !account_id.is_empty() {
                builder = builder.account_id(account_id);
            }
        }
        if let Ok(name) = std::env::var(env::PROJECT_NAME) {
            builder = builder.project_name(name);
        }
        if let Some(secs) = parse_env::<u64>(env::TIMEOUT_SECS) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = parse_env::<u32>(env::MAX_RETRIES) {
            builder = builder.max_retries(retries);
        }
        if let Some(ms) = parse_env::<u64>(env::BACKOFF_BASE_MS) {
            builder = builder.backoff_base(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_env::<u64>(env::BACKOFF_MAX_MS) {
            builder = builder.backoff_max(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> IssueReportResult<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(IssueReportError::configuration(
                "Base URL must use http or https",
            ));
        }
        if self.max_retries == 0 {
            return Err(IssueReportError::configuration(
                "max_retries must be at least 1",
            ));
        }
        if self.issues_page_size == 0 {
            return Err(IssueReportError::configuration(
                "issues_page_size must be at least 1",
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(IssueReportError::configuration(
                "backoff_base must not exceed backoff_max",
            ));
        }
        Ok(())
    }

    /// Hub id derived from the account id (`b.<account>`).
    pub fn hub_id(&self) -> IssueReportResult<String> {
        self.account_id
            .as_deref()
            .map(|account| format!("b.{}", account))
            .ok_or_else(|| {
                IssueReportError::Configuration(ConfigurationError::MissingSetting(
                    "account id is not set".to_string(),
                ))
            })
    }

    /// Retry policy for the request executor.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            BackoffPolicy::new(self.backoff_base, self.backoff_max),
        )
    }

    /// Builds an absolute endpoint URL from an already-encoded path.
    pub fn endpoint(&self, path: &str) -> IssueReportResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| IssueReportError::configuration(format!("Invalid URL: {}", e)))
    }
}

impl std::fmt::Debug for IssueReportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueReportConfig")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("account_id", &self.account_id)
            .field("project_name", &self.project_name)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for IssueReportConfig.
pub struct IssueReportConfigBuilder {
    base_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_uri: Option<String>,
    scope: Option<String>,
    account_id: Option<String>,
    project_name: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    issues_page_size: u32,
    user_agent: Option<String>,
}

impl IssueReportConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: None,
            account_id: None,
            project_name: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
            issues_page_size: 100,
            user_agent: None,
        }
    }

    /// Sets the API host.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the OAuth client id.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the OAuth client secret.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Sets the OAuth redirect URI.
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Sets the OAuth scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the account id.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the report target project name.
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the attempt budget.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the backoff base.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the backoff cap.
    pub fn backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = max;
        self
    }

    /// Sets the issue listing page size.
    pub fn issues_page_size(mut self, size: u32) -> Self {
        self.issues_page_size = size;
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> IssueReportResult<IssueReportConfig> {
        let missing = |what: &str| {
            IssueReportError::Configuration(ConfigurationError::MissingSetting(format!(
                "{} is required",
                what
            )))
        };

        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| IssueReportError::configuration(format!("Invalid base URL: {}", e)))?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("integrations-issue-report/{}", env!("CARGO_PKG_VERSION")));

        let config = IssueReportConfig {
            base_url,
            client_id: self.client_id.ok_or_else(|| missing("client id"))?,
            client_secret: self.client_secret.ok_or_else(|| missing("client secret"))?,
            redirect_uri: self.redirect_uri.ok_or_else(|| missing("redirect uri"))?,
            scope: self.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            account_id: self.account_id,
            project_name: self
                .project_name
                .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            backoff_max: self.backoff_max,
            issues_page_size: self.issues_page_size,
            user_agent,
        };

        config.validate()?;

        Ok(config)
    }
}

impl Default for IssueReportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
