//! Global error formatting.
//!
//! Handlers render [`AppError`](crate::error::AppError) in the standard shape already, but
//! the framework itself answers some requests on its own: unmatched routes, wrong methods,
//! extractor rejections, body-limit violations. Those come back as plain text. This layer
//! rewrites every 4xx/5xx response into the standard error body and stamps the request
//! path on it. Operational endpoints keep their own failure bodies (a 503 health report
//! must still carry its component details).

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::error_body;
use crate::middleware::envelope::is_ambient_path;

/// Error bodies larger than this are replaced instead of parsed.
const MAX_ERROR_BODY: usize = 64 * 1024;
const MAX_MESSAGE_CHARS: usize = 300;

/// Machine-readable code for a status the application did not produce itself.
pub fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::REQUEST_TIMEOUT => "REQUEST_TIMEOUT",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
        StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
        s if s.is_server_error() => "INTERNAL_ERROR",
        _ => "HTTP_ERROR",
    }
}

fn is_json(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

fn is_standard_error(body: &Value) -> bool {
    body.get("success") == Some(&Value::Bool(false)) && body.get("error").map(Value::is_object).unwrap_or(false)
}

fn fallback_message(status: StatusCode, text: &str) -> String {
    let text = text.trim();
    // Server-side failure text can leak internals
    if text.is_empty() || status.is_server_error() {
        return status.canonical_reason().unwrap_or("Error").to_string();
    }
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

pub async fn error_format_middleware(State(cfg): State<Arc<AppConfig>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let res = next.run(req).await;
    let status = res.status();
    if !(status.is_client_error() || status.is_server_error()) || is_ambient_path(&path, &cfg) {
        return res;
    }

    let json = is_json(&res);
    let (mut parts, body) = res.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Discarding unreadable error body: {}", e);
            Default::default()
        }
    };

    let mut formatted = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) if json && is_standard_error(&value) => value,
        Ok(value) if json => {
            // JSON, but not ours (e.g. a JSON extractor rejection body)
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(|m| fallback_message(status, m))
                .unwrap_or_else(|| fallback_message(status, ""));
            error_body(status, code_for_status(status), &message)
        }
        _ => {
            let text = String::from_utf8_lossy(&bytes);
            error_body(status, code_for_status(status), &fallback_message(status, &text))
        }
    };
    formatted["path"] = Value::String(path);

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), path = %formatted["path"], "Request failed");
    } else {
        tracing::debug!(status = status.as_u16(), path = %formatted["path"], "Request rejected");
    }

    let body = serde_json::to_vec(&formatted).unwrap_or_default();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}
