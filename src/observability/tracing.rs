//! Per-request spans.
//!
//! Every inbound request gets one `request` span carrying its method, path
//! and `x-request-id`, so log lines emitted while handling it can be
//! correlated.

use axum::body::Body;
use axum::http::Request;
use ::tracing::Span;

use crate::http::request::request_id;

/// Span factory for `TraceLayer::make_span_with`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    ::tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request.headers()),
    )
}
