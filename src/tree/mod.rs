//! Folder hierarchy traversal.
//!
//! Two independent walks:
//! - [`FolderTreeWalker::pdf_names`] goes breadth-first down from a set of root
//!   folders and returns the sorted set of PDF names found anywhere below them
//! - [`FolderTreeWalker::ancestor_path`] goes up from one folder through its
//!   parents and returns the `/`-joined display names, root first
//!
//! Both keep a visited set of folder ids, so revisits and parent cycles end the
//! walk instead of looping.

use crate::errors::IssueReportResult;
use crate::services::{pdf_names, DataService};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, warn};

/// Walks folders through the data management service.
pub struct FolderTreeWalker<'a> {
    data: &'a DataService,
}

impl<'a> FolderTreeWalker<'a> {
    /// Creates a walker on top of `data`.
    pub fn new(data: &'a DataService) -> Self {
        Self { data }
    }

    /// Sorted, deduplicated names of every PDF below `roots`.
    pub async fn pdf_names(
        &self,
        project_id: &str,
        roots: Vec<String>,
    ) -> IssueReportResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut queue: VecDeque<String> = roots.into();
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(folder_id) = queue.pop_front() {
            if !visited.insert(folder_id.clone()) {
                continue;
            }

            let contents = self.data.folder_contents_all(project_id, &folder_id).await?;
            names.extend(pdf_names(&contents.included));

            for resource in &contents.data {
                if !resource.is_folder() {
                    continue;
                }
                if let Some(id) = resource.id.as_deref() {
                    if !visited.contains(id) {
                        queue.push_back(id.to_string());
                    }
                }
            }
        }

        debug!(folders = visited.len(), pdfs = names.len(), "Folder tree walked");
        Ok(names)
    }

    /// Display names from the root down to `start`, joined with `/`.
    pub async fn ancestor_path(
        &self,
        project_id: &str,
        start: Option<&str>,
    ) -> IssueReportResult<String> {
        let mut names = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = start.filter(|id| !id.is_empty()).map(str::to_string);

        while let Some(folder_id) = current {
            if !visited.insert(folder_id.clone()) {
                warn!(folder = %folder_id, "Cycle in folder parents, path truncated");
                break;
            }

            let folder = self.data.folder(project_id, &folder_id).await?;
            let name = folder.attributes.display_or_name();
            if !name.is_empty() {
                names.push(name.to_string());
            }
            current = self.data.folder_parent_id(project_id, &folder_id).await?;
        }

        names.reverse();
        Ok(names.join("/"))
    }
}
