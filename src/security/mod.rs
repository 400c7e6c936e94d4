//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve canonical client key)
//!     → rate_limit.rs (check per-key, per-route-class quota)
//!     → headers.rs (attach security response headers)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input; identity headers honored only when the
//!   platform is configured as trusted

pub mod client_ip;
pub mod headers;
pub mod rate_limit;
