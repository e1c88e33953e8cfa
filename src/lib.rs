//! # api-starter
//!
//! A backend service scaffold: clone it, add routes, ship. It wires up everything a CRUD
//! API needs before the first endpoint is written.
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, TOML files, `STARTER__*` env)
//! - [`db`]: SQLite pool, pragmas and migrations
//! - [`cache`]: Redis client wrapper with key prefixing and timeouts
//! - [`storage`]: S3-compatible object storage wrapper
//! - [`pagination`]: offset pagination engine, query extractor, search and sort builders
//! - [`health`]: component health indicators
//! - [`error`]: the application error type and its JSON rendering
//! - [`middleware`]: error formatting, response envelope, timeout, request id, headers
//! - [`routes`]: health, metrics, version and API docs endpoints
//! - [`app`]: router assembly, the extension point for application routes
//!
//! ## Adding routes
//!
//! ```rust,ignore
//! let api = Router::new().route("/users", get(list_users));
//! let app = api_starter::app::build_router_with(state, api);
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod tests;
