//! Field normalization for report rows.

use crate::types::{Comment, Issue};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use url::{form_urlencoded, Url};

/// Prefix of data management project ids that the issues API does not use.
pub const PROJECT_ID_PREFIX: &str = "b.";

/// Query parameter carrying the viewable id on document links.
pub const VIEWABLE_PARAM: &str = "viewableGuid";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Issues project id for a data management project id.
pub fn issues_project_id(project_id: &str) -> &str {
    project_id
        .strip_prefix(PROJECT_ID_PREFIX)
        .unwrap_or(project_id)
}

/// Reduces an ISO-8601 timestamp to `YYYY-MM-DD`.
///
/// Unparseable input is returned unchanged; `None` becomes an empty string.
pub fn normalize_date(value: Option<&str>) -> String {
    let raw = match value {
        Some(raw) if !raw.is_empty() => raw,
        _ => return String::new(),
    };

    calendar_date(&raw.replace('Z', "+00:00"))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn calendar_date(value: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    for format in OFFSET_FORMATS {
        if let Ok(timestamp) = DateTime::parse_from_str(value, format) {
            return Some(timestamp.date_naive());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp.date());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Collapses line breaks and runs of whitespace into single spaces.
pub fn clean_comment_text(value: Option<&str>) -> String {
    value
        .unwrap_or("")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleaned comment bodies, oldest first, joined with `", "`. Empty bodies are dropped.
pub fn join_comments(mut comments: Vec<Comment>) -> String {
    comments.sort_by(|a, b| {
        a.created_at
            .as_deref()
            .unwrap_or("")
            .cmp(b.created_at.as_deref().unwrap_or(""))
    });
    comments
        .iter()
        .map(|comment| clean_comment_text(comment.body.as_deref()))
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Viewable id of an issue: placements first, then linked documents.
pub fn extract_viewable_guid(issue: &Issue) -> Option<String> {
    let from_placements = issue
        .placements()
        .iter()
        .find_map(|placement| placement.viewable.as_ref()?.identifier());
    let from_documents = || {
        issue.linked_documents().iter().find_map(|document| {
            document.details.as_ref()?.viewable.as_ref()?.identifier()
        })
    };
    from_placements.or_else(from_documents).map(str::to_string)
}

/// Appends `viewableGuid=<guid>` to `link`, keeping existing parameters.
pub fn with_viewable_param(link: &str, guid: Option<&str>) -> String {
    let guid = match guid {
        Some(guid) if !guid.is_empty() && !link.is_empty() => guid,
        _ => return link.to_string(),
    };

    if let Ok(mut url) = Url::parse(link) {
        url.query_pairs_mut().append_pair(VIEWABLE_PARAM, guid);
        return url.to_string();
    }

    let (base, fragment) = match link.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (link, None),
    };
    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    let pair = form_urlencoded::Serializer::new(String::new())
        .append_pair(VIEWABLE_PARAM, guid)
        .finish();

    let mut out = format!("{}{}{}", base, separator, pair);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
