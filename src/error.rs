//! Error taxonomy for the submission pipeline.
//!
//! Every failure a form request can hit is a [`RelayError`]. The HTTP edge
//! maps each variant to a status code and a caller-safe message; upstream
//! diagnostics stay in the server logs.

use axum::http::StatusCode;
use thiserror::Error;

/// Why a submission was rejected before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidSubmission {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid request body")]
    MalformedBody,
}

/// Errors that can occur while handling a form submission.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed field; the reason is safe to show.
    #[error(transparent)]
    Validation(#[from] InvalidSubmission),

    /// Too many requests from one client within the window.
    #[error("Too many requests, please try again later.")]
    RateLimited,

    /// Identity credentials are absent from the environment.
    #[error("Email service is not configured: missing {0}")]
    Configuration(&'static str),

    /// The token endpoint refused the client-credentials grant.
    #[error("Failed to get access token")]
    UpstreamAuth,

    /// The mail API refused the message.
    #[error("Failed to send email")]
    UpstreamSend,

    /// The response deadline passed; the relay keeps running in the background.
    #[error("Request timed out")]
    TimedOut,

    /// Anything else; the detail is logged, never returned.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result type for pipeline operations.
pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Configuration(_)
            | RelayError::UpstreamAuth
            | RelayError::UpstreamSend
            | RelayError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller in the `{error}` body.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::Configuration(_) => "Email service is not configured".to_string(),
            RelayError::Unexpected(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation",
            RelayError::RateLimited => "rate_limited",
            RelayError::Configuration(_) => "configuration",
            RelayError::UpstreamAuth => "upstream_auth",
            RelayError::UpstreamSend => "upstream_send",
            RelayError::TimedOut => "timed_out",
            RelayError::Unexpected(_) => "unexpected",
        }
    }
}
