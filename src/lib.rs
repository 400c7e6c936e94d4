//! Edge request gateway for the shopping-discovery site.
//!
//! Sits in front of the application backend and enforces, per request:
//! client identity resolution, per-route-class fixed-window rate limits,
//! security response headers, and SSRF-safe image proxying for
//! `/api/proxy-image`. Everything else is forwarded to the upstream
//! application unchanged.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
