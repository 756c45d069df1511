//! Issues service.

use super::encode_id;
use crate::client::RequestExecutor;
use crate::errors::IssueReportResult;
use crate::pagination::{collect_offset_pages, OffsetPage};
use crate::types::{Comment, Issue, IssueType, ResultsEnvelope};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Display names of issue types and subtypes, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct IssueTypeMaps {
    /// Type id to name.
    pub types: HashMap<String, String>,
    /// Subtype id to name.
    pub subtypes: HashMap<String, String>,
}

impl IssueTypeMaps {
    /// Builds the maps, skipping entries without an id or a name.
    pub fn from_types(types: Vec<IssueType>) -> Self {
        let mut maps = Self::default();
        for issue_type in types {
            if let (Some(id), Some(name)) = (issue_type.id, issue_type.name) {
                if !id.is_empty() && !name.is_empty() {
                    maps.types.insert(id, name);
                }
            }
            for subtype in issue_type.subtypes.unwrap_or_default() {
                if let (Some(id), Some(name)) = (subtype.id, subtype.name) {
                    if !id.is_empty() && !name.is_empty() {
                        maps.subtypes.insert(id, name);
                    }
                }
            }
        }
        maps
    }

    /// Type name, empty when the id is absent or unknown.
    pub fn type_name(&self, id: Option<&str>) -> &str {
        lookup(&self.types, id)
    }

    /// Subtype name, empty when the id is absent or unknown.
    pub fn subtype_name(&self, id: Option<&str>) -> &str {
        lookup(&self.subtypes, id)
    }
}

fn lookup<'a>(map: &'a HashMap<String, String>, id: Option<&str>) -> &'a str {
    id.and_then(|id| map.get(id)).map(String::as_str).unwrap_or("")
}

/// Service for issue, issue type and comment listings.
pub struct IssuesService {
    executor: Arc<RequestExecutor>,
}

impl IssuesService {
    /// Creates a new issues service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// All issues of a project, following offset pagination.
    pub async fn list_issues(&self, issues_project_id: &str) -> IssueReportResult<Vec<Issue>> {
        let executor = &self.executor;
        let project = encode_id(issues_project_id);
        let project = project.as_str();

        let issues = collect_offset_pages(
            executor.config().issues_page_size,
            |offset, limit| async move {
                let url = executor.endpoint(&format!(
                    "construction/issues/v1/projects/{}/issues?limit={}&offset={}",
                    project, limit, offset
                ))?;
                executor
                    .get_json::<OffsetPage<Issue>>(&url, "list issues")
                    .await
            },
        )
        .await?;

        info!(project = issues_project_id, count = issues.len(), "Issues listed");
        Ok(issues)
    }

    /// Type and subtype display names of a project.
    pub async fn issue_type_maps(
        &self,
        issues_project_id: &str,
    ) -> IssueReportResult<IssueTypeMaps> {
        let url = self.executor.endpoint(&format!(
            "construction/issues/v1/projects/{}/issue-types?include=subtypes",
            encode_id(issues_project_id)
        ))?;
        let envelope: ResultsEnvelope<IssueType> =
            self.executor.get_json(&url, "list issue types").await?;
        Ok(IssueTypeMaps::from_types(envelope.results))
    }

    /// Comments of an issue. A failed listing yields no comments.
    pub async fn comments(
        &self,
        issues_project_id: &str,
        issue_id: &str,
    ) -> IssueReportResult<Vec<Comment>> {
        let url = self.executor.endpoint(&format!(
            "construction/issues/v1/projects/{}/issues/{}/comments",
            encode_id(issues_project_id),
            encode_id(issue_id)
        ))?;
        let envelope: Option<ResultsEnvelope<Comment>> =
            self.executor.get_optional_json(&url).await?;
        let comments = envelope.map(|e| e.results).unwrap_or_default();
        debug!(issue = issue_id, count = comments.len(), "Comments listed");
        Ok(comments)
    }
}
