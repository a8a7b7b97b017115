//! Form relay library.
//!
//! Accepts website form submissions over HTTP, validates them, renders an
//! HTML email and delivers it through the Microsoft Graph mail API.

pub mod config;
pub mod error;
pub mod forms;
pub mod http;
pub mod lifecycle;
pub mod mail;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::schema::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{FormPipeline, Receipt};
