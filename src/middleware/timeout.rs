use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

/// Enforces `http.request_timeout_ms` on the inner stack.
///
/// On expiry the handler future is dropped, so any in-flight work it owns is cancelled.
pub async fn timeout_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limit = state.config.http.request_timeout();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(res) => res,
        Err(_) => {
            state.metrics.inc_timeouts();
            tracing::warn!(%method, %path, timeout_ms = limit.as_millis() as u64, "Request timed out");
            AppError::RequestTimeout { timeout_ms: limit.as_millis() as u64 }.into_response()
        }
    }
}
