//! SSRF-safe image proxy subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/proxy-image?url=...
//!     → validate.rs (parse → credentials → domain → scheme/port)
//!     → fetch.rs (bounded outbound fetch, redirect re-validation,
//!                 status / content-type / size checks)
//!     → handler.rs (cache + CORS headers, serve bytes)
//! ```
//!
//! # Design Decisions
//! - Every stage fails closed and maps to exactly one status code
//! - No outbound request is issued until the URL has fully validated
//! - Redirect hops re-run the domain and scheme/port checks

pub mod fetch;
pub mod handler;
pub mod validate;
