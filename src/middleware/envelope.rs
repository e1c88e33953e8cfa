use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::{json, Map, Value};

use crate::config::AppConfig;

/// Envelope bodies above this size are passed through untouched.
const MAX_ENVELOPE_BODY: usize = 16 * 1024 * 1024;

/// Operational endpoints keep their plain shapes so probes and scrapers can read them.
const AMBIENT_PATHS: &[&str] = &["/health", "/healthz", "/readyz", "/version", "/metrics"];

pub fn is_ambient_path(path: &str, cfg: &AppConfig) -> bool {
    let under = |prefix: &str| path == prefix || path.starts_with(&format!("{}/", prefix));
    AMBIENT_PATHS.iter().any(|p| under(p))
        || (cfg.docs.enabled && (under("/api-doc") || under(cfg.docs.path.trim_end_matches('/'))))
}

/// Wraps a successful JSON payload as `{ success, status, data, meta?, timestamp }`.
///
/// A payload that already carries `data` and `meta` (a paginated page) is lifted so both
/// land at the top level instead of being nested under `data`.
pub fn wrap(status: StatusCode, payload: Value) -> Value {
    let (data, meta) = match payload {
        Value::Object(mut obj) if obj.len() == 2 && obj.contains_key("data") && obj.contains_key("meta") => {
            let data = obj.remove("data").unwrap_or(Value::Null);
            let meta = obj.remove("meta");
            (data, meta)
        }
        other => (other, None),
    };

    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("status".into(), json!(status.as_u16()));
    body.insert("data".into(), data);
    if let Some(meta) = meta {
        body.insert("meta".into(), meta);
    }
    body.insert("timestamp".into(), Value::String(chrono::Utc::now().to_rfc3339()));
    Value::Object(body)
}

pub async fn envelope_middleware(State(cfg): State<Arc<AppConfig>>, req: Request, next: Next) -> Response {
    if !cfg.http.envelope || is_ambient_path(req.uri().path(), &cfg) {
        return next.run(req).await;
    }

    let res = next.run(req).await;
    let status = res.status();
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if !status.is_success() || status == StatusCode::NO_CONTENT || !is_json {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match to_bytes(body, MAX_ENVELOPE_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer response body for envelope: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    // Handlers that build their own envelope are left alone
    if payload.get("success").map(Value::is_boolean).unwrap_or(false) {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let wrapped = wrap(status, payload);
    let body = match serde_json::to_vec(&wrapped) {
        Ok(body) => body,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}
