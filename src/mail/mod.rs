//! Outgoing mail subsystem.
//!
//! # Data Flow
//! ```text
//! normalized submission
//!     → render.rs (subject + self-contained HTML document)
//!     → token.rs (client-credentials grant → bearer token)
//!         ↳ cache.rs (optional reuse until shortly before expiry)
//!     → relay.rs (POST /users/{sender}/sendMail)
//! ```
//!
//! # Design Decisions
//! - Token and mail calls sit behind traits so the pipeline can be driven by mocks
//! - No retries: a single upstream failure fails the submission
//! - Upstream response bodies are logged, never returned to callers

pub mod cache;
pub mod relay;
pub mod render;
pub mod token;

pub use cache::CachedTokenProvider;
pub use relay::{GraphMailer, Mailer};
pub use token::{AccessToken, GraphCredentials, GraphTokenProvider, TokenProvider};

/// Shared mailbox every message is sent as.
pub const SENDER_MAILBOX: &str = "info@secureautomations.ai";

/// Receives consultation requests and a copy of every quiz result.
pub const SALES_MAILBOX: &str = "sales@secureautomations.ai";

/// Receives compliance checkup results.
pub const COMPLIANCE_MAILBOX: &str = "compliance@secureautomations.ai";

/// A rendered message ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}
