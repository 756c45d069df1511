//! Issue/document aggregation into report rows.
//!
//! One [`ReportRow`] is produced per (issue, linked PDF document) pair. Document
//! metadata is resolved through a [`DocumentCache`] that lives for a single
//! [`IssueAggregator::collect_rows`] call, so every document id is looked up
//! remotely at most once per run.

pub mod text;

use crate::errors::IssueReportResult;
use crate::services::{DataService, IssueTypeMaps, IssuesService, ProjectsService};
use crate::types::{Document, Issue, Project, ReportRow};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

pub use text::{
    clean_comment_text, extract_viewable_guid, issues_project_id, join_comments, normalize_date,
    with_viewable_param,
};

/// Outcome of resolving one document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Metadata was fetched.
    Resolved(Document),
    /// The lookup failed; the id is not retried within the run.
    Unresolved,
}

impl Resolution {
    /// The document, if resolved.
    pub fn document(&self) -> Option<&Document> {
        match self {
            Resolution::Resolved(document) => Some(document),
            Resolution::Unresolved => None,
        }
    }
}

/// Per-run memo of document resolutions, keyed by document id.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<String, Resolution>,
}

impl DocumentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached resolution of `id`.
    pub fn get(&self, id: &str) -> Option<&Resolution> {
        self.entries.get(id)
    }

    /// Records the resolution of `id`.
    pub fn insert(&mut self, id: impl Into<String>, resolution: Resolution) {
        self.entries.insert(id.into(), resolution);
    }

    /// Number of ids seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no id was seen yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids whose resolution failed.
    pub fn unresolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|r| matches!(r, Resolution::Unresolved))
            .count()
    }
}

/// Distinct document ids referenced by placements and linked documents, sorted.
pub fn document_ids(issue: &Issue) -> BTreeSet<String> {
    let placements = issue
        .placements()
        .iter()
        .filter_map(|p| p.lineage_urn.as_deref());
    let linked = issue
        .linked_documents()
        .iter()
        .filter_map(|d| d.urn.as_deref());

    placements
        .chain(linked)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins issues with document metadata.
pub struct IssueAggregator<'a> {
    projects: &'a ProjectsService,
    data: &'a DataService,
    issues: &'a IssuesService,
}

impl<'a> IssueAggregator<'a> {
    /// Creates an aggregator over the given services.
    pub fn new(
        projects: &'a ProjectsService,
        data: &'a DataService,
        issues: &'a IssuesService,
    ) -> Self {
        Self {
            projects,
            data,
            issues,
        }
    }

    /// Builds the report rows of the named project.
    ///
    /// Project lookup, issue type and issue listing failures abort the run.
    /// A document that cannot be resolved only drops its own rows.
    pub async fn collect_rows(&self, project_name: &str) -> IssueReportResult<Vec<ReportRow>> {
        let project = self.projects.project_by_name(project_name).await?;
        let issues_project = issues_project_id(&project.id);

        let type_maps = self.issues.issue_type_maps(issues_project).await?;
        let issues = self.issues.list_issues(issues_project).await?;

        let mut cache = DocumentCache::new();
        let mut rows = Vec::new();
        for issue in &issues {
            let issue_rows = self
                .rows_for_issue(&project, issues_project, &type_maps, issue, &mut cache)
                .await?;
            rows.extend(issue_rows);
        }

        info!(
            project = %project.id,
            issues = issues.len(),
            documents = cache.len(),
            unresolved = cache.unresolved_count(),
            rows = rows.len(),
            "Report rows collected"
        );
        Ok(rows)
    }

    async fn rows_for_issue(
        &self,
        project: &Project,
        issues_project: &str,
        type_maps: &IssueTypeMaps,
        issue: &Issue,
        cache: &mut DocumentCache,
    ) -> IssueReportResult<Vec<ReportRow>> {
        let mut documents = Vec::new();
        for id in document_ids(issue) {
            if let Some(document) = self.resolve(&project.id, &id, cache).await? {
                if document.is_pdf {
                    documents.push(document);
                }
            }
        }
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let issue_id = issue.id.clone().unwrap_or_default();
        let comments = if issue_id.is_empty() {
            String::new()
        } else {
            join_comments(self.issues.comments(issues_project, &issue_id).await?)
        };
        let viewable = extract_viewable_guid(issue);

        Ok(documents
            .into_iter()
            .map(|document| ReportRow {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                web_link: with_viewable_param(&document.web_link, viewable.as_deref()),
                document_id: document.id,
                document_name: document.name,
                document_path: document.path,
                issue_id: issue_id.clone(),
                issue_type: type_maps
                    .type_name(issue.issue_type_id.as_deref())
                    .to_string(),
                issue_sub_type: type_maps
                    .subtype_name(issue.issue_subtype_id.as_deref())
                    .to_string(),
                issue_status: issue.status.clone().unwrap_or_default(),
                issue_due_date: normalize_date(issue.due_date.as_deref()),
                issue_start_date: normalize_date(issue.start_date.as_deref()),
                issue_title: issue.title.as_deref().unwrap_or("").trim().to_string(),
                issue_description: issue.description.as_deref().unwrap_or("").trim().to_string(),
                issue_comments: comments.clone(),
            })
            .collect())
    }

    /// Resolves `id` once per run.
    ///
    /// Failures that require the user to authorize again abort the run. Anything
    /// else is cached as unresolved.
    async fn resolve(
        &self,
        project_id: &str,
        id: &str,
        cache: &mut DocumentCache,
    ) -> IssueReportResult<Option<Document>> {
        if let Some(resolution) = cache.get(id) {
            return Ok(resolution.document().cloned());
        }

        match self.data.item_info(project_id, id).await {
            Ok(document) => {
                cache.insert(id, Resolution::Resolved(document.clone()));
                Ok(Some(document))
            }
            Err(error) if error.requires_reauthentication() => Err(error),
            Err(error) => {
                warn!(document = id, error = %error, "Document resolution failed");
                cache.insert(id, Resolution::Unresolved);
                debug!(document = id, "Document cached as unresolved");
                Ok(None)
            }
        }
    }
}
