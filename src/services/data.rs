//! Data management service: folders, items and storage objects.

use super::encode_id;
use crate::client::RequestExecutor;
use crate::errors::{IssueReportResult, ResourceError, ResponseError};
use crate::pagination::{Collected, CursorPage, CursorPaginator};
use crate::tree::FolderTreeWalker;
use crate::types::{DataEnvelope, DataResource, Document, SignedDownload, StorageLocation};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Service for folder, item and storage lookups.
pub struct DataService {
    executor: Arc<RequestExecutor>,
}

impl DataService {
    /// Creates a new data management service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    fn project_url(&self, project_id: &str, rest: &str) -> IssueReportResult<Url> {
        self.executor.endpoint(&format!(
            "data/v1/projects/{}/{}",
            encode_id(project_id),
            rest
        ))
    }

    fn contents_url(&self, project_id: &str, folder_id: &str) -> IssueReportResult<Url> {
        self.project_url(
            project_id,
            &format!("folders/{}/contents", encode_id(folder_id)),
        )
    }

    /// First page of a folder's contents.
    pub async fn folder_contents(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> IssueReportResult<CursorPage<DataResource>> {
        let url = self.contents_url(project_id, folder_id)?;
        self.executor.get_json(&url, "list folder contents").await
    }

    /// All pages of a folder's contents, with `included` records accumulated.
    pub async fn folder_contents_all(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> IssueReportResult<Collected<DataResource>> {
        let executor = &self.executor;
        let mut paginator =
            CursorPaginator::new(self.contents_url(project_id, folder_id)?, |url: Url| async move {
                executor
                    .get_json::<CursorPage<DataResource>>(&url, "list folder contents")
                    .await
            });
        paginator.collect_all().await
    }

    /// Storage location of the first PDF version listed in the folder.
    pub async fn first_pdf_storage(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> IssueReportResult<StorageLocation> {
        let contents = self.folder_contents(project_id, folder_id).await?;
        first_pdf_storage(&contents.included)
            .ok_or_else(|| ResourceError::NoPdfFound(folder_id.to_string()).into())
    }

    /// Time-limited download URL for a storage object.
    pub async fn signed_download_url(
        &self,
        bucket_key: &str,
        object_key: &str,
    ) -> IssueReportResult<String> {
        let url = self.executor.endpoint(&format!(
            "oss/v2/buckets/{}/objects/{}/signeds3download",
            encode_id(bucket_key),
            encode_id(object_key)
        ))?;
        let signed: SignedDownload = self.executor.get_json(&url, "get signed URL").await?;
        signed
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResponseError::MissingField("url".to_string()).into())
    }

    /// Latest version metadata of an item.
    pub async fn item_tip(
        &self,
        project_id: &str,
        item_id: &str,
    ) -> IssueReportResult<DataResource> {
        let url = self.project_url(project_id, &format!("items/{}/tip", encode_id(item_id)))?;
        let envelope: DataEnvelope = self.executor.get_json(&url, "get item tip").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Folder containing an item; `None` when the lookup fails.
    pub async fn item_parent_folder_id(
        &self,
        project_id: &str,
        item_id: &str,
    ) -> IssueReportResult<Option<String>> {
        let url = self.project_url(project_id, &format!("items/{}/parent", encode_id(item_id)))?;
        self.optional_parent(&url).await
    }

    /// Folder metadata.
    pub async fn folder(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> IssueReportResult<DataResource> {
        let url = self.project_url(project_id, &format!("folders/{}", encode_id(folder_id)))?;
        let envelope: DataEnvelope = self.executor.get_json(&url, "get folder").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Parent of a folder; `None` at the root or when the lookup fails.
    pub async fn folder_parent_id(
        &self,
        project_id: &str,
        folder_id: &str,
    ) -> IssueReportResult<Option<String>> {
        let url = self.project_url(
            project_id,
            &format!("folders/{}/parent", encode_id(folder_id)),
        )?;
        self.optional_parent(&url).await
    }

    async fn optional_parent(&self, url: &Url) -> IssueReportResult<Option<String>> {
        let envelope: Option<DataEnvelope> = self.executor.get_optional_json(url).await?;
        Ok(envelope
            .and_then(|e| e.data)
            .and_then(|d| d.id)
            .filter(|id| !id.is_empty()))
    }

    /// Resolves an item to a [`Document`]: tip metadata plus folder path.
    pub async fn item_info(&self, project_id: &str, item_id: &str) -> IssueReportResult<Document> {
        let tip = self.item_tip(project_id, item_id).await?;
        let folder_id = self.item_parent_folder_id(project_id, item_id).await?;
        let path = FolderTreeWalker::new(self)
            .ancestor_path(project_id, folder_id.as_deref())
            .await?;

        let document = Document {
            id: item_id.to_string(),
            name: tip.attributes.name_or_display().to_string(),
            path,
            web_link: tip.web_view_href().to_string(),
            is_pdf: tip.attributes.is_pdf(),
        };
        debug!(id = item_id, name = %document.name, is_pdf = document.is_pdf, "Item resolved");
        Ok(document)
    }
}

/// First PDF version record whose storage reference splits into bucket and object.
pub fn first_pdf_storage(included: &[DataResource]) -> Option<StorageLocation> {
    included
        .iter()
        .filter(|record| record.is_version() && record.attributes.is_pdf())
        .find_map(|record| {
            StorageLocation::from_storage_id(
                record.storage_id()?,
                record.attributes.name_or_display(),
            )
        })
}

/// Names of the PDF version records, in listing order.
pub fn pdf_names(included: &[DataResource]) -> Vec<String> {
    included
        .iter()
        .filter(|record| record.is_version() && record.attributes.is_pdf())
        .map(|record| record.attributes.name_or_display())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
