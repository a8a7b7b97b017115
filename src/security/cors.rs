//! Browser origin allow-list.
//!
//! # Responsibilities
//! - Answer CORS preflights for allowed origins
//! - Reject requests carrying any other `Origin` with 403
//! - Allow `localhost` / `127.0.0.1` origins outside production

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use crate::config::CorsConfig;
use crate::http::response::ApiError;

/// Which origins may call the API.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<HashSet<String>>,
    allow_localhost: bool,
}

impl OriginPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        let allowed = config
            .allowed_origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_ascii_lowercase())
            .collect();
        Self {
            allowed: Arc::new(allowed),
            allow_localhost: !config.production,
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/').to_ascii_lowercase();
        if self.allowed.contains(&origin) {
            return true;
        }
        self.allow_localhost && is_local_origin(&origin)
    }

    /// CORS layer answering for the same set of origins.
    pub fn cors_layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                origin.to_str().map(|o| policy.is_allowed(o)).unwrap_or(false)
            }))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }
}

fn is_local_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
        }
        Err(_) => false,
    }
}

/// Middleware rejecting requests from origins outside the policy.
/// Requests without an `Origin` header (curl, server-to-server) pass.
pub async fn origin_middleware(
    State(policy): State<OriginPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match origin {
        Some(origin) if !policy.is_allowed(&origin) => {
            tracing::warn!(origin = %origin, "Rejected request from disallowed origin");
            ApiError::new(StatusCode::FORBIDDEN, "Not allowed by CORS").into_response()
        }
        _ => next.run(request).await,
    }
}
