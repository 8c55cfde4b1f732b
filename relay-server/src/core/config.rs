use cloud_client::ClientConfig;
use std::time::Duration;

use crate::services::executor::DEFAULT_STUDIO_TIMEOUT;
use crate::services::log_buffer::DEFAULT_LOG_CAPACITY;
use crate::services::peer_monitor::DEFAULT_IDLE_TIMEOUT;

/// Relay configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | RELAY_HOST | 127.0.0.1 | bind host |
/// | RELAY_PORT | 8000 | bind port |
/// | LOG_LEVEL | info | fallback log level when RUST_LOG is unset |
/// | LOG_DIR | (unset) | rolling log file directory |
/// | STUDIO_TIMEOUT_SECS | 20 | default wait for a plugin result |
/// | LOG_BUFFER_CAPACITY | 200 | studio log lines kept in memory |
/// | PEER_IDLE_TIMEOUT_SECS | 10 | plugin considered gone after this much silence |
/// | ROBLOX_API_KEY | (unset) | enables cloud calls |
/// | ROBLOX_UNIVERSE_ID | (unset) | required together with the API key |
/// | ROBLOX_PLACE_ID | (unset) | default place for script runs and publishing |
/// | CLOUD_API_BASE_URL | https://apis.roblox.com | cloud API base |
/// | CLOUD_DEVELOP_BASE_URL | https://develop.roblox.com | publish API base |
/// | CLOUD_REQUEST_TIMEOUT_SECS | 30 | per-request timeout for cloud calls |
///
/// # Example
///
/// ```ignore
/// RELAY_PORT=8100 ROBLOX_API_KEY=... ROBLOX_UNIVERSE_ID=123 cargo run -p relay-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub studio_timeout: Duration,
    pub log_buffer_capacity: usize,
    pub peer_idle_timeout: Duration,
    /// `None` when the API key or universe id is missing; the cloud route is then disabled
    pub cloud: Option<ClientConfig>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            host: env_string("RELAY_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            port: env_parse("RELAY_PORT").unwrap_or(8000),
            log_level: env_string("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: env_string("LOG_DIR"),
            studio_timeout: env_parse("STUDIO_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STUDIO_TIMEOUT),
            log_buffer_capacity: env_parse("LOG_BUFFER_CAPACITY").unwrap_or(DEFAULT_LOG_CAPACITY),
            peer_idle_timeout: env_parse("PEER_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_IDLE_TIMEOUT),
            cloud: Self::cloud_from_env(),
        }
    }

    fn cloud_from_env() -> Option<ClientConfig> {
        let api_key = env_string("ROBLOX_API_KEY");
        let universe_id = env_parse::<u64>("ROBLOX_UNIVERSE_ID");
        let (Some(api_key), Some(universe_id)) = (api_key, universe_id) else {
            return None;
        };

        let mut cloud = ClientConfig::new(api_key, universe_id);
        if let Some(place_id) = env_parse("ROBLOX_PLACE_ID") {
            cloud = cloud.with_place_id(place_id);
        }
        if let Some(url) = env_string("CLOUD_API_BASE_URL") {
            cloud = cloud.with_api_base_url(url);
        }
        if let Some(url) = env_string("CLOUD_DEVELOP_BASE_URL") {
            cloud = cloud.with_develop_base_url(url);
        }
        if let Some(secs) = env_parse("CLOUD_REQUEST_TIMEOUT_SECS") {
            cloud = cloud.with_request_timeout(Duration::from_secs(secs));
        }
        Some(cloud)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cloud_configured(&self) -> bool {
        self.cloud.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
