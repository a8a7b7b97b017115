//! OAuth2 client-credentials token acquisition.
//!
//! # Responsibilities
//! - Read the service identity from the environment
//! - Exchange it for a bearer token at the tenant token endpoint
//! - Keep token endpoint diagnostics out of caller-visible errors

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::MailConfig;
use crate::error::{RelayError, RelayResult};
use crate::observability::metrics;

pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3599;

/// Longest lifetime honored from the token endpoint.
const MAX_EXPIRES_IN_SECS: u64 = 86_400;

fn token_lifetime(declared: Option<u64>) -> Duration {
    Duration::from_secs(declared.unwrap_or(DEFAULT_EXPIRES_IN_SECS).min(MAX_EXPIRES_IN_SECS))
}

/// A bearer token and the lifetime the server declared for it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_in: Duration,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
        }
    }

    /// Raw token for the `Authorization` header.
    pub fn bearer(&self) -> &str {
        &self.secret
    }

    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }
}

// Tokens end up in request spans; never print them.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Source of bearer tokens for the mail relay.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token valid for at least one mail call.
    async fn access_token(&self) -> RelayResult<AccessToken>;

    /// Identity the tokens are issued for. Keys the token cache.
    fn identity(&self) -> String {
        "default".to_string()
    }

    /// Forget any token held for reuse. Called after the mail API refuses one.
    fn invalidate(&self) {}
}

/// A required identity variable is absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("missing environment variable {0}")]
pub struct MissingCredential(pub &'static str);

impl From<MissingCredential> for RelayError {
    fn from(missing: MissingCredential) -> Self {
        RelayError::Configuration(missing.0)
    }
}

/// Service identity for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct GraphCredentials {
    pub client_id: String,
    pub tenant_id: String,
    pub client_secret: String,
}

impl fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl GraphCredentials {
    /// Read the identity from `AZURE_CLIENT_ID`, `AZURE_TENANT_ID` and
    /// `AZURE_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, MissingCredential> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the identity through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MissingCredential> {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(MissingCredential(name))
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR)?,
            tenant_id: read(TENANT_ID_VAR)?,
            client_secret: read(CLIENT_SECRET_VAR)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Client-credentials token provider for Microsoft Graph.
pub struct GraphTokenProvider {
    http: reqwest::Client,
    authority_url: String,
    scope: String,
    credentials: Result<GraphCredentials, MissingCredential>,
}

impl GraphTokenProvider {
    /// Create a provider. Missing credentials are not fatal here: every
    /// token request fails with a configuration error instead.
    pub fn new(
        http: reqwest::Client,
        config: &MailConfig,
        credentials: Result<GraphCredentials, MissingCredential>,
    ) -> Self {
        Self {
            http,
            authority_url: config.authority_url.trim_end_matches('/').to_string(),
            scope: config.scope.clone(),
            credentials,
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_url, tenant_id)
    }
}

#[async_trait]
impl TokenProvider for GraphTokenProvider {
    async fn access_token(&self) -> RelayResult<AccessToken> {
        let credentials = match &self.credentials {
            Ok(c) => c,
            Err(missing) => {
                tracing::error!(variable = missing.0, "Mail credentials are not configured");
                metrics::record_upstream_failure("configuration");
                return Err((*missing).into());
            }
        };

        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(self.token_url(&credentials.tenant_id))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token request failed");
                metrics::record_upstream_failure("token");
                RelayError::UpstreamAuth
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token endpoint rejected client credentials");
            metrics::record_upstream_failure("token");
            return Err(RelayError::UpstreamAuth);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Token endpoint returned an unreadable body");
            metrics::record_upstream_failure("token");
            RelayError::UpstreamAuth
        })?;

        let expires_in = token_lifetime(token.expires_in);
        tracing::debug!(expires_in = expires_in.as_secs(), "Obtained access token");
        Ok(AccessToken::new(token.access_token, expires_in))
    }

    fn identity(&self) -> String {
        match &self.credentials {
            Ok(c) => format!("{}/{}", c.tenant_id, c.client_id),
            Err(_) => "unconfigured".to_string(),
        }
    }
}
