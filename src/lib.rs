//! Issue Report Integration Module
//!
//! Resilient, authenticated client that walks a remote document hierarchy
//! (projects, folders, items) and an issue tracker, joins issues with the PDF
//! documents they are placed on, and produces flat report rows.
//!
//! # Features
//!
//! - **Auth Session**: OAuth authorization code exchange, proactive refresh,
//!   and credential invalidation over a pluggable token store
//! - **Resilience**: bounded retries with `Retry-After` aware exponential
//!   backoff and a single re-authentication per call on 401
//! - **Pagination**: cursor (`links.next`) and offset/limit listings
//! - **Folder Traversal**: breadth-first PDF discovery and ancestor paths,
//!   both cycle-safe
//! - **Aggregation**: issue/document join with per-run memoized document
//!   resolution
//!
//! # Example
//!
//! ```no_run
//! use integrations_issue_report::{InMemoryTokenStore, IssueReportClient, IssueReportConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IssueReportConfig::builder()
//!     .client_id("client_id")
//!     .client_secret("client_secret")
//!     .redirect_uri("http://localhost:8000/auth/callback/")
//!     .account_id("account")
//!     .build()?;
//!
//! let client = IssueReportClient::new(config, Arc::new(InMemoryTokenStore::new()))?;
//! println!("Authorize at {}", client.auth().authorization_url());
//!
//! // After the redirect:
//! client.auth().exchange_code("code-from-callback").await?;
//!
//! for row in client.collect_rows().await? {
//!     println!("{} {} {}", row.issue_id, row.document_name, row.issue_comments);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod pagination;
pub mod report;
pub mod resilience;
pub mod services;
pub mod token;
pub mod transport;
pub mod tree;
pub mod types;

// Test support
pub mod mocks;

// Re-exports for convenience
pub use auth::{AuthProvider, AuthSession};
pub use client::{IssueReportClient, RequestExecutor};
pub use config::{IssueReportConfig, IssueReportConfigBuilder};
pub use errors::{IssueReportError, IssueReportResult};
pub use token::{Credential, InMemoryTokenStore, TokenStore};
pub use types::{Document, ReportRow};

/// Prelude module with commonly used types and traits.
///
/// ```no_run
/// use integrations_issue_report::prelude::*;
/// ```
pub mod prelude {
    // Client
    pub use crate::client::{IssueReportClient, RequestExecutor};

    // Configuration
    pub use crate::config::{IssueReportConfig, IssueReportConfigBuilder};

    // Authentication
    pub use crate::auth::{AuthProvider, AuthSession};
    pub use crate::token::{Credential, InMemoryTokenStore, TokenStore};

    // Services
    pub use crate::services::{DataService, IssueTypeMaps, IssuesService, ProjectsService};

    // Aggregation
    pub use crate::report::{DocumentCache, IssueAggregator, Resolution};
    pub use crate::tree::FolderTreeWalker;

    // Common types
    pub use crate::types::{Comment, Document, Issue, Project, ReportRow, StorageLocation};

    // Errors
    pub use crate::errors::{IssueReportError, IssueReportResult};

    // Resilience
    pub use crate::resilience::{BackoffPolicy, RetryPolicy};

    // Transport
    pub use crate::transport::{HttpTransport, ReqwestTransport};
}
