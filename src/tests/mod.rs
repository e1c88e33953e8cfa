//! In-crate tests.
//!
//! - **pagination_tests**: normalization, metadata arithmetic and the async engine
//! - **filter_tests**: search/sort builders against a real SQLite table
//! - **query_tests**: the pagination query-string extractor
//! - **config_tests**: layered loading and validation
//! - **error_tests**: error rendering and conversions
//! - **middleware_tests**: envelope, error format, timeout, request id, headers
//! - **health_api_tests**: health, readiness, metrics and version endpoints
//! - **cache_tests**: Redis wrapper (live tests need `STARTER_TEST_REDIS_URL`)
//! - **storage_tests**: object storage wrapper on the in-memory backend
//! - **db_tests**: pool setup and migrations

pub mod db_tests;
pub mod error_tests;
pub mod query_tests;
pub mod storage_tests;

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::state::AppState;

/// State over a private in-memory SQLite database.
pub(crate) async fn test_state(config: AppConfig) -> AppState {
    // One connection: every in-memory connection is its own database
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    AppState::new(pool, config)
}

pub(crate) async fn send(app: Router, req: Request<Body>) -> Response {
    app.oneshot(req).await.unwrap()
}

pub(crate) async fn get(app: Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub(crate) async fn body_bytes(res: Response) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub(crate) async fn body_json(res: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}
