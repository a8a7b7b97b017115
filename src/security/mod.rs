//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight + origin allow-list)
//!     → body limit (tower-http, configured size)
//!     → rate_limit.rs (per-client fixed window, form endpoints only)
//!         ↳ store.rs (record storage)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Limiter state lives in an injected store owned by the server
//! - The sweep only bounds memory; expired windows reset on access

pub mod cors;
pub mod rate_limit;
pub mod store;

pub use cors::OriginPolicy;
pub use rate_limit::{Decision, RateLimiter};
pub use store::{MemoryStore, RateLimitRecord, RateLimitStore};
