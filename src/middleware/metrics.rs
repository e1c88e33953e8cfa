use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::metrics::Metrics;

/// Keeps the in-flight gauge honest when the request future is dropped mid-flight.
struct InFlight<'a>(&'a Metrics);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.request_ended();
    }
}

// Counts every request and its response status class
pub async fn metrics_middleware(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    metrics.request_started();
    let guard = InFlight(&metrics);
    let res = next.run(req).await;
    drop(guard);
    metrics.record_status(res.status());
    res
}
