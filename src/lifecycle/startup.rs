//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared upstream HTTP client
//! - Assemble the token provider (cached or not) and the mailer
//! - Hand the server a ready [`FormPipeline`]
//!
//! # Design Decisions
//! - Fail fast: a client that cannot be built is fatal
//! - Missing credentials are logged here and surface per request as 500

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::RelayConfig;
use crate::mail::token::MissingCredential;
use crate::mail::{
    CachedTokenProvider, GraphCredentials, GraphMailer, GraphTokenProvider, TokenProvider,
    SENDER_MAILBOX,
};
use crate::pipeline::FormPipeline;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the pipeline with credentials read from the environment.
pub fn build_pipeline(config: &RelayConfig) -> Result<FormPipeline, StartupError> {
    build_pipeline_with(config, GraphCredentials::from_env())
}

/// Build the pipeline with explicit credentials.
pub fn build_pipeline_with(
    config: &RelayConfig,
    credentials: Result<GraphCredentials, MissingCredential>,
) -> Result<FormPipeline, StartupError> {
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeouts.upstream_connect_secs))
        .timeout(Duration::from_secs(config.timeouts.request_secs))
        .build()?;

    match &credentials {
        Ok(c) => tracing::info!(
            tenant_id = %c.tenant_id,
            client_id = %c.client_id,
            "Mail credentials loaded"
        ),
        Err(missing) => tracing::warn!(
            variable = missing.0,
            "Mail credentials incomplete; form submissions will fail until configured"
        ),
    }

    let provider = GraphTokenProvider::new(http.clone(), &config.mail, credentials);
    let tokens: Arc<dyn TokenProvider> = if config.mail.cache_tokens {
        let margin = Duration::from_secs(config.mail.token_refresh_margin_secs);
        Arc::new(CachedTokenProvider::new(provider, margin))
    } else {
        Arc::new(provider)
    };

    let mailer = GraphMailer::new(http, &config.mail.graph_url, SENDER_MAILBOX);
    tracing::debug!(send_url = mailer.send_url(), "Mail relay configured");

    Ok(FormPipeline::new(tokens, Arc::new(mailer)))
}
