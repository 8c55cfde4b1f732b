//! Server Implementation
//!
//! Binds the relay's HTTP listener and runs it until ctrl-c

use std::net::SocketAddr;

use crate::core::{Config, Result, ServerError, ServerState};
use crate::services::http::build_app;

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> Result<()> {
        let state = self.state.clone();
        state.start_background_tasks();

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        tracing::info!(
            addr = %addr,
            cloud_configured = state.executor.cloud_configured(),
            "Relay server listening"
        );

        let app = build_app(state.clone());
        let shutdown_state = state.clone();
        let shutdown = async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            shutdown_state.shutdown();
        };

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Internal(e.into()))?;

        Ok(())
    }
}
