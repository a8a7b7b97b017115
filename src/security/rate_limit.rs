//! Fixed-window rate limiting for the form endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, ConnectInfo, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::security::store::{RateLimitRecord, RateLimitStore};

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset_time: u64 },
    Limited { retry_after_ms: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Fixed-window counter keyed by client address.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window_ms: u64,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window_ms: config.window_ms,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Count a request from `key` now.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, now_ms())
    }

    /// Count a request from `key` at `now` (epoch milliseconds).
    pub fn check_at(&self, key: &str, now: u64) -> Decision {
        let window_ms = self.window_ms;
        let record = self.store.update(key, &mut |current| match current {
            Some(record) if !record.is_expired(now) => RateLimitRecord {
                count: record.count.saturating_add(1),
                ..record
            },
            _ => RateLimitRecord {
                count: 1,
                reset_time: now.saturating_add(window_ms),
            },
        });

        if record.count > self.max_requests {
            Decision::Limited {
                retry_after_ms: record.reset_time.saturating_sub(now),
            }
        } else {
            Decision::Allowed {
                remaining: self.max_requests - record.count,
                reset_time: record.reset_time,
            }
        }
    }

    /// Drop records whose window has ended.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    pub fn sweep_at(&self, now: u64) -> usize {
        let removed = self.store.sweep(now);
        metrics::record_rate_limit_records(self.store.len());
        removed
    }

    /// Periodically sweep expired records until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = every.as_millis() as u64, "Rate limit sweeper starting");

        let mut ticker = time::interval(every);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "Swept expired rate limit records");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Key for the request: first `X-Forwarded-For` hop when trusted,
    /// otherwise the peer IP.
    pub fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        let extensions = request.extensions();
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .or_else(|| {
                extensions
                    .get::<MockConnectInfo<SocketAddr>>()
                    .map(|MockConnectInfo(addr)| addr.ip())
            })
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Middleware rejecting clients over their window budget with 429.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = limiter.client_key(&request);

    match limiter.check(&key) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Limited { retry_after_ms } => {
            tracing::warn!(client = %key, retry_after_ms, "Rate limit exceeded");
            metrics::record_rate_limited();

            let mut response = ApiError::from(RelayError::RateLimited).into_response();
            let retry_after_secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
