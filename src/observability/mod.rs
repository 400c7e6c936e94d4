//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; one line per request outcome
//! - Metrics are cheap counter/histogram updates, exposed for Prometheus
//! - Nothing logged contains secrets, credentialed URLs, or upstream
//!   bodies — only method, route class, and outcome code

pub mod metrics;
