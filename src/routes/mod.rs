//! HTTP route handlers shipped with the scaffold.
//!
//! - `health`: liveness, readiness, aggregated component health, metrics and version
//! - `docs`: OpenAPI document and Swagger UI
//!
//! Application endpoints are supplied by the caller through [`crate::app::build_router_with`].

pub mod docs;
pub mod health;
