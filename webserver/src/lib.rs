//! HTTP transport for the fabrication backend
//!
//! Thin adapters around the factory engine: request decoding, error-to-
//! status mapping, JSON responses. No lifecycle logic lives here.

pub mod error;
pub mod webserver_impl;

// Re-export main types
pub use error::{ApiError, WebServerError, WebServerResult};
pub use webserver_impl::WebServer;
