//! Pagination handling.
//!
//! Two shapes are supported:
//! - cursor pages (`links.next` as a string or as an object with `href`/`url`),
//!   which also carry auxiliary `included` records
//! - offset/limit pages (`results` + `pagination.totalResults`)
//!
//! Both collectors fetch one page at a time and concatenate in page order.

use crate::errors::{IssueReportError, IssueReportResult};
use serde::Deserialize;
use std::future::Future;
use std::marker::PhantomData;
use tracing::debug;
use url::Url;

/// Continuation link of a cursor page.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NextLink {
    /// Bare URL.
    Href(String),
    /// Object exposing the URL under `href` or `url`.
    Object {
        /// Preferred field.
        #[serde(default)]
        href: Option<String>,
        /// Fallback field.
        #[serde(default)]
        url: Option<String>,
    },
}

impl NextLink {
    /// The link target, if it is non-empty.
    pub fn target(&self) -> Option<&str> {
        let target = match self {
            NextLink::Href(href) => Some(href.as_str()),
            NextLink::Object { href, url } => href
                .as_deref()
                .filter(|h| !h.is_empty())
                .or(url.as_deref()),
        };
        target.filter(|t| !t.is_empty())
    }
}

/// Links block of a cursor page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageLinks {
    /// Next page, absent on the last page.
    pub next: Option<NextLink>,
}

/// Raw cursor page as returned by the remote.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CursorPage<T> {
    /// Primary records.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
    /// Auxiliary records.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub included: Vec<T>,
    /// Links.
    #[serde(default)]
    pub links: Option<PageLinks>,
}

impl<T> CursorPage<T> {
    /// Target of the `next` link, if any.
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_ref())
            .and_then(NextLink::target)
    }
}

/// Everything accumulated across cursor pages.
#[derive(Debug, Clone)]
pub struct Collected<T> {
    /// Primary records in page order.
    pub data: Vec<T>,
    /// Auxiliary records in page order.
    pub included: Vec<T>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            included: Vec::new(),
        }
    }
}

/// Follows `links.next` until it disappears.
pub struct CursorPaginator<T, F, Fut>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = IssueReportResult<CursorPage<T>>>,
{
    fetch_fn: F,
    next_url: Option<Url>,
    pages: usize,
    _marker: PhantomData<T>,
}

impl<T, F, Fut> CursorPaginator<T, F, Fut>
where
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = IssueReportResult<CursorPage<T>>>,
{
    /// Creates a paginator starting at `first`.
    pub fn new(first: Url, fetch_fn: F) -> Self {
        Self {
            fetch_fn,
            next_url: Some(first),
            pages: 0,
            _marker: PhantomData,
        }
    }

    /// Fetches the next page of results.
    pub async fn next_page(&mut self) -> IssueReportResult<Option<CursorPage<T>>> {
        let url = match self.next_url.take() {
            Some(url) => url,
            None => return Ok(None),
        };

        let page = (self.fetch_fn)(url.clone()).await?;
        self.pages += 1;

        if let Some(next) = page.next_link() {
            // Relative links resolve against the page that carried them.
            let next = Url::parse(next).or_else(|_| url.join(next)).map_err(|e| {
                IssueReportError::deserialization(format!("Invalid next link '{}': {}", next, e))
            })?;
            self.next_url = Some(next);
        }

        Ok(Some(page))
    }

    /// Collects all remaining records from all pages.
    pub async fn collect_all(&mut self) -> IssueReportResult<Collected<T>> {
        let mut collected = Collected::default();

        while let Some(page) = self.next_page().await? {
            collected.data.extend(page.data);
            collected.included.extend(page.included);
        }

        debug!(
            pages = self.pages,
            records = collected.data.len(),
            included = collected.included.len(),
            "Cursor pagination finished"
        );
        Ok(collected)
    }

    /// Returns true if there are more pages to fetch.
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }
}

/// Pagination block of an offset page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OffsetPagination {
    /// Total number of records reported by the remote.
    pub total_results: Option<u64>,
}

/// Raw offset/limit page.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct OffsetPage<T> {
    /// Records of this page.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub results: Vec<T>,
    /// Pagination block.
    #[serde(default)]
    pub pagination: Option<OffsetPagination>,
}

/// Fetches `page_size` records at a time until `offset` reaches the reported total.
///
/// A missing total means "what we have so far". An empty page always stops.
pub async fn collect_offset_pages<T, F, Fut>(
    page_size: u32,
    mut fetch: F,
) -> IssueReportResult<Vec<T>>
where
    F: FnMut(u64, u32) -> Fut,
    Fut: Future<Output = IssueReportResult<OffsetPage<T>>>,
{
    let page_size = page_size.max(1);
    let mut out = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let page = fetch(offset, page_size).await?;
        let empty = page.results.is_empty();
        let reported = page.pagination.and_then(|p| p.total_results);
        out.extend(page.results);

        let total = reported.unwrap_or(out.len() as u64);
        offset += u64::from(page_size);
        if offset >= total || empty {
            break;
        }
    }

    debug!(records = out.len(), "Offset pagination finished");
    Ok(out)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
