//! Core module: configuration, shared state, errors
//!
//! - [`Config`] - relay configuration
//! - [`ServerState`] - shared services
//! - [`Server`] - HTTP server
//! - [`ServerError`] - startup and serving errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
