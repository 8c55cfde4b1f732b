//! Client configuration

use crate::http::RetryPolicy;
use crate::poller::PollPolicy;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://apis.roblox.com";
pub const DEFAULT_DEVELOP_BASE_URL: &str = "https://develop.roblox.com";

/// Cloud client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Universe all calls are scoped to
    pub universe_id: u64,
    /// Default place for script execution and publishing
    pub place_id: Option<u64>,
    /// Base URL of the open cloud API
    pub api_base_url: String,
    /// Base URL of the place publishing API
    pub develop_base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub poll: PollPolicy,
    /// Execution budget handed to the remote script runner
    pub luau_timeout: Duration,
    /// Added to `luau_timeout` to get the polling deadline
    pub luau_poll_grace: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, universe_id: u64) -> Self {
        Self {
            api_key: api_key.into(),
            universe_id,
            place_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            develop_base_url: DEFAULT_DEVELOP_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            luau_timeout: Duration::from_secs(30),
            luau_poll_grace: Duration::from_secs(30),
        }
    }

    pub fn with_place_id(mut self, place_id: u64) -> Self {
        self.place_id = Some(place_id);
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_develop_base_url(mut self, url: impl Into<String>) -> Self {
        self.develop_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_luau_timeout(mut self, timeout: Duration) -> Self {
        self.luau_timeout = timeout;
        self
    }

    pub fn with_luau_poll_grace(mut self, grace: Duration) -> Self {
        self.luau_poll_grace = grace;
        self
    }

    /// Base URL operation paths are resolved against
    pub fn operations_base_url(&self) -> String {
        format!("{}/cloud/v2", self.api_base_url)
    }
}
