//! Cross-cutting HTTP layers.
//!
//! Each module exposes an axum `from_fn` middleware; [`crate::app`] stacks them in a fixed
//! order so that every response leaving the service has passed the error formatter and,
//! when successful, the envelope.

pub mod envelope;
pub mod error_format;
pub mod metrics;
pub mod request_context;
pub mod security_headers;
pub mod timeout;

pub use request_context::{RequestId, RequestInfo};
