use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::PaginationOptions;

/// Query-string input for list endpoints: `?page=2&limit=20&search=foo&sortBy=name&sortOrder=asc`.
///
/// The extractor never rejects a request. Values that are absent, blank or not
/// integers come through as `None` and are replaced by defaults during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RawPaginationQuery {
    /// Page number, 1-based. Defaults to 1.
    pub page: Option<String>,
    /// Items per page, 1..=100. Defaults to 10.
    pub limit: Option<String>,
    /// Free-text search across the endpoint's searchable fields.
    pub search: Option<String>,
    #[serde(alias = "sort_by", rename = "sortBy")]
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    #[serde(alias = "sort_order", rename = "sortOrder")]
    pub sort_order: Option<String>,
}

impl PaginationQuery {
    pub fn options(&self) -> PaginationOptions {
        PaginationOptions { page: self.page, limit: self.limit }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

impl From<RawPaginationQuery> for PaginationQuery {
    fn from(raw: RawPaginationQuery) -> Self {
        Self {
            page: parse_int(raw.page.as_deref()),
            limit: parse_int(raw.limit.as_deref()),
            search: non_blank(raw.search),
            sort_by: non_blank(raw.sort_by),
            sort_order: non_blank(raw.sort_order),
        }
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl<S> FromRequestParts<S> for PaginationQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match Query::<RawPaginationQuery>::try_from_uri(&parts.uri) {
            Ok(Query(raw)) => raw,
            Err(e) => {
                tracing::debug!("Unparseable pagination query, using defaults: {}", e);
                RawPaginationQuery::default()
            }
        };
        Ok(raw.into())
    }
}
