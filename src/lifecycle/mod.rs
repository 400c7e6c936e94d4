//! Lifecycle management subsystem.
//!
//! Startup is linear (config → subsystems → listener); shutdown is
//! coordinated through a broadcast channel so the server and any helper
//! tasks stop together.

pub mod shutdown;

pub use shutdown::Shutdown;
