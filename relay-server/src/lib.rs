//! Relay server between tool callers, a polling studio plugin and the cloud API
//!
//! # Module layout
//!
//! ```text
//! relay-server/src/
//! ├── bridge/        # command queue + result correlation for the plugin
//! ├── core/          # config, shared state, server, errors
//! ├── services/      # execution facade, studio logs, peer monitor, router
//! ├── api/           # HTTP handlers
//! └── utils/         # logging
//! ```

pub mod api;
pub mod bridge;
pub mod core;
pub mod services;
pub mod utils;

pub use bridge::{Bridge, BridgeError, BridgeResult};
pub use crate::core::{Config, Server, ServerError, ServerState};
pub use services::http::build_app;
pub use services::{CloudCall, ExecuteError, RemoteCall, RemoteExecutor};
pub use utils::init_logger;

/// Load `.env` and initialize logging from the environment
pub fn setup_environment() {
    dotenvy::dotenv().ok();
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger(&level, log_dir.as_deref());
}
