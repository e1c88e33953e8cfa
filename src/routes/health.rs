use crate::health::{self, HealthReport};
use crate::metrics::MetricsSnapshot;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Liveness probe - no dependencies touched
#[utoipa::path(get, path = "/healthz", tag = "health", responses((status = 200, description = "Process is alive", body = String)))]
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
#[utoipa::path(
    get,
    path = "/readyz",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = String),
        (status = 503, description = "Database unreachable", body = String)
    )
)]
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let query = crate::db::ping(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(())) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

/// Aggregated health of every configured backing service.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All components up", body = HealthReport),
        (status = 503, description = "At least one component down", body = HealthReport)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let indicators = health::indicators(&state);
    let report = health::check_all(&indicators, state.metrics.uptime_seconds()).await;
    let status = if report.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report))
}

// Metrics endpoint: returns JSON snapshot
#[utoipa::path(get, path = "/metrics", tag = "health", responses((status = 200, body = MetricsSnapshot)))]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = serde_json::to_value(state.metrics.get_snapshot()).unwrap_or_default();
    if let Some(cache) = state.cache.as_ref() {
        body["cache"] = serde_json::to_value(cache.stats()).unwrap_or_default();
    }
    Json(body)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let mut body = String::new();
    let mut push = |name: &str, kind: &str, help: &str, value: u64| {
        body.push_str(&format!(
            "# HELP api_starter_{name} {help}\n# TYPE api_starter_{name} {kind}\napi_starter_{name} {value}\n"
        ));
    };
    push("requests_total", "counter", "HTTP requests received", m.requests_total);
    push("requests_in_flight", "gauge", "HTTP requests currently being served", m.requests_in_flight);
    push("responses_2xx_total", "counter", "Responses with a 2xx status", m.responses_2xx);
    push("responses_3xx_total", "counter", "Responses with a 3xx status", m.responses_3xx);
    push("responses_4xx_total", "counter", "Responses with a 4xx status", m.responses_4xx);
    push("responses_5xx_total", "counter", "Responses with a 5xx status", m.responses_5xx);
    push("request_timeouts_total", "counter", "Requests aborted by the request timeout", m.timeouts);
    push("uptime_seconds", "gauge", "Uptime seconds", m.uptime_seconds);
    if let Some(cache) = state.cache.as_ref() {
        let s = cache.stats();
        push("cache_hits_total", "counter", "Cache reads that found a value", s.hits);
        push("cache_misses_total", "counter", "Cache reads that found nothing", s.misses);
        push("cache_errors_total", "counter", "Failed cache commands", s.errors);
    }
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
#[utoipa::path(get, path = "/version", tag = "health", responses((status = 200, description = "Build information")))]
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
