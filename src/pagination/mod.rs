//! Offset pagination independent of the data source.
//!
//! Callers hand [`paginate`] the raw page/limit input and a fetch callback
//! `(skip, take) -> (items, total)`. The engine clamps the input, computes the
//! offset, awaits the callback once and derives [`PaginationMeta`] from what the
//! callback reported. A SQL query, a search backend or an in-memory slice all fit
//! behind the same callback.
//!
//! ```rust,ignore
//! let page = paginate(query.options(), |skip, take| async move {
//!     let rows = repo.list(skip, take).await?;
//!     let total = repo.count().await?;
//!     Ok::<_, AppError>((rows, total))
//! })
//! .await?;
//! ```

pub mod filter;
pub mod query;

use std::future::Future;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use filter::{SearchFilter, SortOptions, SortOrder};
pub use query::PaginationQuery;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Raw page/limit input as received from a caller. Any value is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationOptions {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationOptions {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page: Some(page), limit: Some(limit) }
    }
}

/// Normalized options: `page >= 1` and `1 <= limit <= MAX_LIMIT` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Number of items to bypass before the current page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn take(&self) -> u64 {
        self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

impl From<PageRequest> for PaginationOptions {
    fn from(req: PageRequest) -> Self {
        Self {
            page: Some(i64::try_from(req.page).unwrap_or(i64::MAX)),
            limit: Some(req.limit as i64),
        }
    }
}

/// Clamps raw input to the nearest valid value. Never fails.
///
/// A missing or non-positive page becomes 1. A missing or non-positive limit becomes
/// [`DEFAULT_LIMIT`]; a positive limit is capped at [`MAX_LIMIT`].
pub fn normalize(options: &PaginationOptions) -> PageRequest {
    let page = match options.page {
        Some(p) if p > 0 => p as u64,
        _ => DEFAULT_PAGE,
    };
    let limit = match options.limit {
        Some(l) if l > 0 => (l as u64).min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };
    PageRequest { page, limit }
}

/// Navigation metadata for one page, derived from the fetch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Total matching items across all pages, as reported by the data source.
    pub total: u64,
    /// Items returned on this page.
    pub count: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    /// 1-based index of the first item on this page, 0 when there are no items at all.
    pub first_item: u64,
    pub last_item: u64,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn build(total: u64, count: u64, request: &PageRequest) -> Self {
        let page = request.page;
        let limit = request.limit;
        let skip = request.skip();

        let total_pages = total.div_ceil(limit).max(1);
        let (first_item, last_item) = if total == 0 {
            (0, 0)
        } else {
            (skip.saturating_add(1), skip.saturating_add(count))
        };
        let has_next_page = page < total_pages;
        let has_previous_page = page > 1;

        Self {
            total,
            count,
            page,
            limit,
            total_pages,
            first_item,
            last_item,
            next_page: has_next_page.then(|| page + 1),
            previous_page: has_previous_page.then(|| page - 1),
            has_next_page,
            has_previous_page,
        }
    }
}

/// One page of items plus its metadata; serializes as `{ "data": [...], "meta": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    /// Applies `f` to every item, keeping order and metadata.
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated { data: self.data.into_iter().map(f).collect(), meta: self.meta }
    }
}

/// Normalizes `options`, calls `fetch(skip, take)` once and builds the page.
///
/// Errors from `fetch` are returned unchanged.
pub async fn paginate<T, E, F, Fut>(options: PaginationOptions, fetch: F) -> Result<Paginated<T>, E>
where
    F: FnOnce(u64, u64) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, u64), E>>,
{
    let request = normalize(&options);
    let (items, total) = fetch(request.skip(), request.take()).await?;
    let meta = PaginationMeta::build(total, items.len() as u64, &request);
    tracing::trace!(page = meta.page, limit = meta.limit, total = meta.total, count = meta.count, "paginated");
    Ok(Paginated { data: items, meta })
}

/// Like [`paginate`], applying `transform` to each fetched item in order.
pub async fn paginate_with<T, U, E, F, Fut, M>(
    options: PaginationOptions,
    fetch: F,
    transform: M,
) -> Result<Paginated<U>, E>
where
    F: FnOnce(u64, u64) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, u64), E>>,
    M: FnMut(T) -> U,
{
    Ok(paginate(options, fetch).await?.map(transform))
}
