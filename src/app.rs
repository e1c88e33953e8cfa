//! Router assembly.
//!
//! Layer order, outermost first: CORS, security headers, request id, tracing, metrics,
//! error format, envelope, timeout. The timeout sits innermost so its 408 is still
//! formatted and counted like any other error.

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{routing::get, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::error::AppError;
use crate::middleware::{envelope, error_format, metrics, request_context, security_headers, timeout};
use crate::routes::{docs, health};
use crate::state::AppState;

/// The scaffold router without application routes.
pub fn build_router(state: AppState) -> Router {
    build_router_with(state, Router::new())
}

/// The scaffold router with `api_routes` mounted under `http.api_prefix`.
pub fn build_router_with(state: AppState, api_routes: Router<AppState>) -> Router {
    let cfg = state.config.clone();
    let prefix = cfg.http.api_prefix.trim_end_matches('/');

    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .merge(docs::router(&cfg.docs));

    // axum refuses to nest at the root
    app = if prefix.is_empty() { app.merge(api_routes) } else { app.nest(prefix, api_routes) };

    let app = app
        .fallback(fallback)
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
        .layer(from_fn_with_state(state.clone(), timeout::timeout_middleware))
        .layer(from_fn_with_state(cfg.clone(), envelope::envelope_middleware))
        .layer(from_fn_with_state(cfg.clone(), error_format::error_format_middleware))
        .layer(from_fn_with_state(state.metrics.clone(), metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_context::request_id_middleware))
        .layer(from_fn_with_state(cfg.clone(), security_headers::security_headers_middleware));

    match cors_layer(&cfg.http) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

// Nested routers see a stripped `Uri`; report the path the client asked for
async fn fallback(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("Cannot {} {}", method, uri.path()))
}

/// CORS for the configured origins. With no origins configured, debug builds are
/// permissive for local front-end development and release builds stay same-origin.
pub fn cors_layer(cfg: &HttpConfig) -> Option<CorsLayer> {
    if cfg.cors_origins.is_empty() {
        return cfg!(debug_assertions).then(CorsLayer::permissive);
    }
    if cfg.cors_origins.iter().any(|o| o.trim() == "*") {
        return Some(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }
    let origins: Vec<HeaderValue> = cfg
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", o, e);
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
            .expose_headers([axum::http::HeaderName::from_static(request_context::REQUEST_ID_HEADER)]),
    )
}
