use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use cloud_client::OpenCloudClient;

use crate::bridge::Bridge;
use crate::core::{Config, Result, ServerError};
use crate::services::{PeerMonitor, RemoteExecutor, StudioLogBuffer};

/// Shared relay state, cheap to clone
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | immutable configuration |
/// | bridge | command queue and pending results for the studio plugin |
/// | executor | studio and cloud execution facade |
/// | logs | recent studio output |
/// | monitor | plugin connection tracking |
/// | shutdown | cancels background tasks |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub bridge: Arc<Bridge>,
    pub executor: Arc<RemoteExecutor>,
    pub logs: Arc<StudioLogBuffer>,
    pub monitor: Arc<PeerMonitor>,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// Build every service from `config`
    pub fn initialize(config: &Config) -> Result<Self> {
        let cloud = match &config.cloud {
            Some(cloud_config) => {
                let client = OpenCloudClient::new(cloud_config.clone())
                    .map_err(|e| ServerError::Config(e.to_string()))?;
                tracing::info!(
                    universe_id = cloud_config.universe_id,
                    place_id = ?cloud_config.place_id,
                    "Cloud execution enabled"
                );
                Some(Arc::new(client))
            }
            None => {
                tracing::warn!("ROBLOX_API_KEY or ROBLOX_UNIVERSE_ID not set, cloud execution disabled");
                None
            }
        };
        Ok(Self::with_cloud(config.clone(), cloud))
    }

    /// Build state around an already constructed cloud client (or none)
    pub fn with_cloud(config: Config, cloud: Option<Arc<OpenCloudClient>>) -> Self {
        let bridge = Arc::new(Bridge::new());
        let executor = RemoteExecutor::new(bridge.clone(), cloud)
            .with_studio_timeout(config.studio_timeout);
        Self {
            logs: Arc::new(StudioLogBuffer::new(config.log_buffer_capacity)),
            monitor: Arc::new(PeerMonitor::new(config.peer_idle_timeout)),
            executor: Arc::new(executor),
            bridge,
            shutdown: CancellationToken::new(),
            config,
        }
    }

    pub fn start_background_tasks(&self) {
        tokio::spawn(self.monitor.clone().run_sweeper(self.shutdown.clone()));
    }

    /// Stop background tasks and release every waiting caller
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.bridge.abandon_pending();
    }
}
