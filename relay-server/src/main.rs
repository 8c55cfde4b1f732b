use relay_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env, logging)
    setup_environment();

    tracing::info!("Relay server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. Shared state
    let state = ServerState::initialize(&config)?;

    // 4. Serve until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
