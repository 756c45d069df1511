//! Wire payloads and domain types.
//!
//! Remote payloads are deserialized leniently: every field is optional and an
//! explicit `null` is treated like an absent field, so a partially populated
//! record never fails a whole page.

use serde::{Deserialize, Serialize};

/// Storage references carry this prefix before `<bucket>/<object>`.
pub const STORAGE_URN_PREFIX: &str = "urn:adsk.objects:os.object:";

/// Resource type of folders in folder listings.
pub const FOLDER_TYPE: &str = "folders";

/// Resource type of version records in `included`.
pub const VERSION_TYPE: &str = "versions";

// ============================================================================
// Data management resources
// ============================================================================

/// Attributes shared by projects, folders, items and versions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attributes {
    /// Name.
    pub name: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// File extension reported by the remote, e.g. "pdf".
    pub file_type: Option<String>,
}

impl Attributes {
    /// `name`, falling back to `displayName`. Used for items and versions.
    pub fn name_or_display(&self) -> &str {
        non_empty(self.name.as_deref())
            .or_else(|| non_empty(self.display_name.as_deref()))
            .unwrap_or("")
    }

    /// `displayName`, falling back to `name`. Used for folders.
    pub fn display_or_name(&self) -> &str {
        non_empty(self.display_name.as_deref())
            .or_else(|| non_empty(self.name.as_deref()))
            .unwrap_or("")
    }

    /// Whether the file type or, failing that, the name marks a PDF.
    pub fn is_pdf(&self) -> bool {
        let file_type = self.file_type.as_deref().unwrap_or("");
        file_type.eq_ignore_ascii_case("pdf")
            || self.name_or_display().to_ascii_lowercase().ends_with(".pdf")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Reference to another resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceRef {
    /// Referenced id.
    pub id: Option<String>,
    /// Referenced type.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A relationship wrapper (`{"data": {...}}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Relationship {
    /// Target of the relationship.
    pub data: Option<ResourceRef>,
}

/// Relationships of a resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Relationships {
    /// Storage object backing a version.
    pub storage: Option<Relationship>,
}

/// A plain hyperlink.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Link {
    /// Target URL.
    pub href: Option<String>,
}

/// Links of a resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceLinks {
    /// Browser link to the document viewer.
    pub web_view: Option<Link>,
    /// Relationships exposed under `links` by some endpoints.
    pub relationships: Option<Relationships>,
}

/// A generic data management resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataResource {
    /// Resource id.
    pub id: Option<String>,
    /// Resource type ("folders", "items", "versions", ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Attributes.
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    /// Relationships.
    #[serde(deserialize_with = "null_as_default")]
    pub relationships: Relationships,
    /// Links.
    #[serde(deserialize_with = "null_as_default")]
    pub links: ResourceLinks,
}

impl DataResource {
    /// Returns true for folder resources.
    pub fn is_folder(&self) -> bool {
        self.kind.as_deref() == Some(FOLDER_TYPE)
    }

    /// Returns true for version resources.
    pub fn is_version(&self) -> bool {
        self.kind.as_deref() == Some(VERSION_TYPE)
    }

    /// Storage reference id, from `relationships` or `links.relationships`.
    pub fn storage_id(&self) -> Option<&str> {
        fn storage_of(relationships: Option<&Relationships>) -> Option<&str> {
            relationships
                .and_then(|r| r.storage.as_ref())
                .and_then(|s| s.data.as_ref())
                .and_then(|d| d.id.as_deref())
                .filter(|id| !id.is_empty())
        }

        storage_of(Some(&self.relationships))
            .or_else(|| storage_of(self.links.relationships.as_ref()))
    }

    /// Web viewer link, or an empty string.
    pub fn web_view_href(&self) -> &str {
        self.links
            .web_view
            .as_ref()
            .and_then(|l| l.href.as_deref())
            .unwrap_or("")
    }
}

/// Single-resource envelope (`{"data": {...}}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataEnvelope {
    /// The resource.
    pub data: Option<DataResource>,
}

/// Bucket/object pair of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// Bucket key.
    pub bucket_key: String,
    /// Object key.
    pub object_key: String,
    /// File name of the version the storage belongs to.
    pub file_name: String,
}

impl StorageLocation {
    /// Splits `urn:adsk.objects:os.object:<bucket>/<object>`.
    pub fn from_storage_id(storage_id: &str, file_name: impl Into<String>) -> Option<Self> {
        let rest = storage_id.strip_prefix(STORAGE_URN_PREFIX)?;
        let (bucket, object) = rest.split_once('/')?;
        Some(Self {
            bucket_key: bucket.to_string(),
            object_key: object.to_string(),
            file_name: file_name.into(),
        })
    }
}

/// Signed download response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignedDownload {
    /// Pre-authenticated URL.
    pub url: Option<String>,
}

// ============================================================================
// Projects
// ============================================================================

/// A project visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Project id (data management namespace, e.g. `b.<uuid>`).
    pub id: String,
    /// Project name.
    pub name: String,
}

// ============================================================================
// Issues
// ============================================================================

/// Viewable reference inside a placement or linked document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Viewable {
    /// Viewable guid.
    pub guid: Option<String>,
    /// Viewable id, used when no guid is given.
    pub id: Option<String>,
}

impl Viewable {
    /// `guid`, falling back to `id`.
    pub fn identifier(&self) -> Option<&str> {
        non_empty(self.guid.as_deref()).or_else(|| non_empty(self.id.as_deref()))
    }
}

/// Placement of an issue on a document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placement {
    /// Lineage id of the document the issue is placed on.
    pub lineage_urn: Option<String>,
    /// Viewable the marker lives in.
    pub viewable: Option<Viewable>,
}

/// Details of a linked document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkedDocumentDetails {
    /// Viewable of the linked document.
    pub viewable: Option<Viewable>,
}

/// Document linked to an issue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkedDocument {
    /// Document id.
    pub urn: Option<String>,
    /// Details.
    pub details: Option<LinkedDocumentDetails>,
}

/// Raw issue as returned by the issue listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    /// Issue id.
    pub id: Option<String>,
    /// Issue type id.
    pub issue_type_id: Option<String>,
    /// Issue subtype id.
    pub issue_subtype_id: Option<String>,
    /// Raw status.
    pub status: Option<String>,
    /// Due date (ISO-8601).
    pub due_date: Option<String>,
    /// Start date (ISO-8601).
    pub start_date: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Placements on documents.
    pub placements: Option<Vec<Placement>>,
    /// Linked documents.
    pub linked_documents: Option<Vec<LinkedDocument>>,
}

impl Issue {
    /// Placements, empty when absent.
    pub fn placements(&self) -> &[Placement] {
        self.placements.as_deref().unwrap_or(&[])
    }

    /// Linked documents, empty when absent.
    pub fn linked_documents(&self) -> &[LinkedDocument] {
        self.linked_documents.as_deref().unwrap_or(&[])
    }
}

/// Issue comment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    /// Creation timestamp (ISO-8601).
    pub created_at: Option<String>,
    /// Body text.
    pub body: Option<String>,
}

/// Issue subtype.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueSubtype {
    /// Subtype id.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
}

/// Issue type with its embedded subtypes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueType {
    /// Type id.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Subtypes.
    pub subtypes: Option<Vec<IssueSubtype>>,
}

/// Generic `{"results": [...]}` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResultsEnvelope<T> {
    /// Results.
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub results: Vec<T>,
}

// ============================================================================
// Report
// ============================================================================

/// Document resolved for a report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Document id.
    pub id: String,
    /// File name.
    pub name: String,
    /// Folder path, root to leaf, joined with `/`.
    pub path: String,
    /// Viewer link, empty when absent.
    pub web_link: String,
    /// Whether the document is a PDF.
    pub is_pdf: bool,
}

/// One row per (issue, linked PDF document) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Project id.
    pub project_id: String,
    /// Project name.
    pub project_name: String,
    /// Document id.
    pub document_id: String,
    /// Document name.
    pub document_name: String,
    /// Document folder path.
    pub document_path: String,
    /// Viewer link, with the issue's viewable appended when known.
    pub web_link: String,
    /// Issue id.
    pub issue_id: String,
    /// Issue type display name.
    pub issue_type: String,
    /// Issue subtype display name.
    pub issue_sub_type: String,
    /// Raw status.
    pub issue_status: String,
    /// Due date as `YYYY-MM-DD` when parseable.
    pub issue_due_date: String,
    /// Start date as `YYYY-MM-DD` when parseable.
    pub issue_start_date: String,
    /// Trimmed title.
    pub issue_title: String,
    /// Trimmed description.
    pub issue_description: String,
    /// Cleaned comments in creation order, joined with `", "`.
    pub issue_comments: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
