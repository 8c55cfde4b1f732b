//! API routes
//!
//! - [`plugin`] - endpoints polled by the studio plugin
//! - [`execute`] - execution and log access for tool callers
//! - [`health`] - health check

pub mod execute;
pub mod health;
pub mod plugin;
