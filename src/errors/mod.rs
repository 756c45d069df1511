//! Error types for the issue report integration.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for issue report operations.
pub type IssueReportResult<T> = Result<T, IssueReportError>;

/// Top-level error type for the issue report integration.
#[derive(Debug, Error)]
pub enum IssueReportError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// The remote answered with a non-success status.
    #[error("Remote call failed: {operation} returned HTTP {status}: {body}")]
    RemoteCallFailed {
        /// Logical operation that failed (e.g. "list issues").
        operation: String,
        /// Response status.
        status: StatusCode,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// Semantic lookup failure.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Transport failure that outlived the retry budget.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response error.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl IssueReportError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        IssueReportError::Configuration(ConfigurationError::InvalidConfiguration(msg.into()))
    }

    /// Creates an auth-expired error.
    pub fn auth_expired(msg: impl Into<String>) -> Self {
        IssueReportError::Authentication(AuthenticationError::AuthExpired(msg.into()))
    }

    /// Creates a remote-call error.
    pub fn remote_call(
        operation: impl Into<String>,
        status: StatusCode,
        body: impl Into<String>,
    ) -> Self {
        IssueReportError::RemoteCallFailed {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        IssueReportError::Resource(ResourceError::NotFound(msg.into()))
    }

    /// Creates a deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        IssueReportError::Response(ResponseError::DeserializationError(msg.into()))
    }

    /// Returns true when the caller has to send the user through authorization again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            IssueReportError::Authentication(AuthenticationError::Unauthenticated)
                | IssueReportError::Authentication(AuthenticationError::AuthExpired(_))
                | IssueReportError::Authentication(AuthenticationError::RefreshFailed(_))
        )
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            IssueReportError::Authentication(AuthenticationError::AuthExpired(_)) => {
                Some(StatusCode::UNAUTHORIZED)
            }
            IssueReportError::RemoteCallFailed { status, .. } => Some(*status),
            IssueReportError::Resource(_) => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing setting.
    #[error("Missing setting: {0}")]
    MissingSetting(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// No credential is stored; authorization has to be initiated.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The credential was rejected and could not be recovered. The store is cleared.
    #[error("Access token invalid or expired: {0}")]
    AuthExpired(String),

    /// The token endpoint rejected the refresh token. The store is cleared.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The authorization code exchange was rejected.
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The token cannot be sent as a header value.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Resource errors.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No accessible project carries the requested name.
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    /// Generic missing resource (top folder, parent, ...).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The folder holds no PDF with a usable storage reference.
    #[error("No PDF found in folder {0}")]
    NoPdfFound(String),
}

/// Response errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A required field was absent.
    #[error("Missing field in response: {0}")]
    MissingField(String),
}

/// Transport errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Any other failure of the HTTP stack.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
