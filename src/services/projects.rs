//! Project listing service.

use super::encode_id;
use crate::client::RequestExecutor;
use crate::errors::{IssueReportError, IssueReportResult, ResourceError};
use crate::pagination::{CursorPage, CursorPaginator};
use crate::types::{DataResource, Project};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Service for hub-level project lookups.
pub struct ProjectsService {
    executor: Arc<RequestExecutor>,
}

impl ProjectsService {
    /// Creates a new projects service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    async fn collect(&self, first: Url, operation: &str) -> IssueReportResult<Vec<DataResource>> {
        let executor = &self.executor;
        let mut paginator = CursorPaginator::new(first, |url: Url| async move {
            executor
                .get_json::<CursorPage<DataResource>>(&url, operation)
                .await
        });
        Ok(paginator.collect_all().await?.data)
    }

    /// Lists every project of the configured hub, across all pages.
    pub async fn list_projects(&self) -> IssueReportResult<Vec<Project>> {
        let hub_id = self.executor.config().hub_id()?;
        let url = self
            .executor
            .endpoint(&format!("project/v1/hubs/{}/projects", encode_id(&hub_id)))?;
        info!(url = %url, "Listing projects");

        let projects: Vec<Project> = self
            .collect(url, "list projects")
            .await?
            .into_iter()
            .filter_map(|resource| {
                let id = resource.id?;
                Some(Project {
                    name: resource.attributes.name.unwrap_or_default(),
                    id,
                })
            })
            .collect();

        info!(count = projects.len(), "Projects listed");
        Ok(projects)
    }

    /// Finds a project by exact name.
    pub async fn project_by_name(&self, project_name: &str) -> IssueReportResult<Project> {
        let projects = self.list_projects().await?;
        match projects.into_iter().find(|p| p.name == project_name) {
            Some(project) => {
                info!(id = %project.id, name = project_name, "Project matched");
                Ok(project)
            }
            None => {
                info!(name = project_name, "Project not found");
                Err(ResourceError::ProjectNotFound(project_name.to_string()).into())
            }
        }
    }

    /// Id of the project with the given exact name.
    pub async fn project_id_by_name(&self, project_name: &str) -> IssueReportResult<String> {
        Ok(self.project_by_name(project_name).await?.id)
    }

    /// Ids of the project's top-level folders, in listing order.
    pub async fn top_folder_ids(&self, project_id: &str) -> IssueReportResult<Vec<String>> {
        let hub_id = self.executor.config().hub_id()?;
        let url = self.executor.endpoint(&format!(
            "project/v1/hubs/{}/projects/{}/topFolders",
            encode_id(&hub_id),
            encode_id(project_id)
        ))?;

        Ok(self
            .collect(url, "list top folders")
            .await?
            .into_iter()
            .filter_map(|resource| resource.id)
            .collect())
    }

    /// Id of the first top-level folder.
    pub async fn first_top_folder_id(&self, project_id: &str) -> IssueReportResult<String> {
        self.top_folder_ids(project_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                IssueReportError::not_found(format!("No top folders in project {}", project_id))
            })
    }
}
