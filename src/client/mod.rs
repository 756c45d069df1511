//! Issue report client implementation.

use crate::auth::AuthSession;
use crate::config::IssueReportConfig;
use crate::errors::{IssueReportError, IssueReportResult};
use crate::report::IssueAggregator;
use crate::services::*;
use crate::token::TokenStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::tree::FolderTreeWalker;
use crate::types::ReportRow;
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

mod executor;
pub use executor::RequestExecutor;

/// Issue report client.
///
/// Entry point for the operations the outer CLI/web layer needs: building the
/// issue report, listing PDFs, issuing signed download URLs, and handing out
/// authenticated headers. Every remote call goes through one shared
/// [`RequestExecutor`].
///
/// # Example
///
/// ```no_run
/// use integrations_issue_report::{InMemoryTokenStore, IssueReportClient, IssueReportConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IssueReportConfig::from_env()?;
/// let client = IssueReportClient::new(config, Arc::new(InMemoryTokenStore::new()))?;
///
/// let rows = client.collect_rows().await?;
/// println!("{} rows", rows.len());
/// # Ok(())
/// # }
/// ```
pub struct IssueReportClient {
    /// Configuration.
    config: IssueReportConfig,
    /// Auth session owning the token store.
    auth: Arc<AuthSession>,
    /// Request executor.
    executor: Arc<RequestExecutor>,
}

impl IssueReportClient {
    /// Creates a client over the reqwest transport.
    pub fn new(config: IssueReportConfig, store: Arc<dyn TokenStore>) -> IssueReportResult<Self> {
        let transport = ReqwestTransport::with_connect_timeout(config.connect_timeout).map_err(|e| {
            IssueReportError::configuration(format!("Failed to create transport: {}", e))
        })?;
        Self::with_transport(config, store, Arc::new(transport))
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: IssueReportConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> IssueReportResult<Self> {
        config.validate()?;

        let auth = Arc::new(AuthSession::new(&config, store, transport.clone())?);
        let executor = Arc::new(RequestExecutor::new(
            config.clone(),
            transport,
            auth.clone(),
        )?);

        Ok(Self {
            config,
            auth,
            executor,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IssueReportConfig {
        &self.config
    }

    /// Access the auth session (authorization URL, code exchange, status).
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Access the shared request executor.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    // Service accessors

    /// Access the projects service.
    pub fn projects(&self) -> ProjectsService {
        ProjectsService::new(self.executor.clone())
    }

    /// Access the data management service.
    pub fn data(&self) -> DataService {
        DataService::new(self.executor.clone())
    }

    /// Access the issues service.
    pub fn issues(&self) -> IssuesService {
        IssuesService::new(self.executor.clone())
    }

    /// Valid access token, refreshed if it is about to expire.
    pub async fn ensure_token(&self) -> IssueReportResult<SecretString> {
        self.auth.ensure_token().await
    }

    /// Bearer authorization headers.
    pub async fn headers(&self) -> IssueReportResult<HeaderMap> {
        self.auth.headers().await
    }

    /// Report rows of the configured project.
    pub async fn collect_rows(&self) -> IssueReportResult<Vec<ReportRow>> {
        self.collect_rows_for(&self.config.project_name).await
    }

    /// Report rows of the named project.
    pub async fn collect_rows_for(&self, project_name: &str) -> IssueReportResult<Vec<ReportRow>> {
        let projects = self.projects();
        let data = self.data();
        let issues = self.issues();
        IssueAggregator::new(&projects, &data, &issues)
            .collect_rows(project_name)
            .await
    }

    /// Time-limited download URL for a storage object.
    pub async fn signed_download_url(
        &self,
        bucket_key: &str,
        object_key: &str,
    ) -> IssueReportResult<String> {
        self.data().signed_download_url(bucket_key, object_key).await
    }

    /// Sorted names of every PDF in the project.
    pub async fn list_all_pdf_names(
        &self,
        project_id: &str,
    ) -> IssueReportResult<BTreeSet<String>> {
        let roots = self.projects().top_folder_ids(project_id).await?;
        let data = self.data();
        FolderTreeWalker::new(&data).pdf_names(project_id, roots).await
    }

    /// Signed download URL of the first PDF in the project's first top-level folder.
    pub async fn signed_url_for_first_pdf(&self, project_name: &str) -> IssueReportResult<String> {
        let projects = self.projects();
        let data = self.data();

        let project_id = projects.project_id_by_name(project_name).await?;
        let folder_id = projects.first_top_folder_id(&project_id).await?;
        let location = data.first_pdf_storage(&project_id, &folder_id).await?;
        info!(
            project = %project_id,
            file = %location.file_name,
            "Issuing signed URL for first PDF"
        );
        data.signed_download_url(&location.bucket_key, &location.object_key)
            .await
    }
}

impl std::fmt::Debug for IssueReportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueReportClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
