//! HTTP dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware stack)
//!     → security middleware (rate limit, response headers)
//!     → /api/proxy-image → proxy subsystem
//!     → everything else  → forward.rs (pass-through to the app backend)
//! ```

pub mod error;
pub mod forward;
pub mod server;

pub use error::GatewayError;
pub use server::HttpServer;
