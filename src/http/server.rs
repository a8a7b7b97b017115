//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the form and health routes
//! - Wire up middleware (request ID, tracing, panic recovery, CORS, limits)
//! - Own the rate limiter and its background sweeper
//! - Bind server to listener and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::handlers;
use crate::http::request::UuidRequestId;
use crate::http::response::panic_response;
use crate::lifecycle::Shutdown;
use crate::observability::tracing::make_request_span;
use crate::pipeline::FormPipeline;
use crate::security::cors::{origin_middleware, OriginPolicy};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::store::{MemoryStore, RateLimitStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FormPipeline>,
    /// How long a handler waits for the relay before answering 504.
    pub request_timeout: Duration,
}

/// HTTP server for the form relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a server with an in-process rate-limit store.
    pub fn new(config: RelayConfig, pipeline: FormPipeline) -> Self {
        Self::with_store(config, pipeline, Arc::new(MemoryStore::new()))
    }

    /// Create a server whose limiter keeps its records in `store`.
    pub fn with_store(
        config: RelayConfig,
        pipeline: FormPipeline,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(store, &config.rate_limit)));

        let state = AppState {
            pipeline: Arc::new(pipeline),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(&config, state, limiter.clone());
        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &RelayConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut forms = Router::new()
            .route("/api/contact-form", post(handlers::consultation))
            .route("/api/contact", post(handlers::consultation))
            .route("/api/send-email", post(handlers::checkup))
            .route("/api/submit-quiz", post(handlers::quiz));

        if let Some(limiter) = limiter {
            forms = forms.route_layer(middleware::from_fn_with_state(
                limiter,
                rate_limit_middleware,
            ));
        }

        let policy = OriginPolicy::from_config(&config.cors);

        forms
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(middleware::from_fn_with_state(policy.clone(), origin_middleware))
            .layer(policy.cors_layer())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.limiter.is_some(),
            "HTTP server starting"
        );

        if let Some(limiter) = self.limiter.clone() {
            let every = Duration::from_millis(self.config.rate_limit.sweep_interval_ms);
            tokio::spawn(limiter.run_sweeper(every, shutdown.subscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
