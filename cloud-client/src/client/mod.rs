//! Typed cloud API client
//!
//! Builds requests for the cloud endpoints and interprets their responses.
//! All network behaviour (retries, rate limiting) lives in the [`Executor`];
//! long-running work is observed through the [`OperationPoller`].

mod datastore;
mod luau;
mod place;

pub use datastore::{DatastorePage, EntryRef, SetEntry};
pub use luau::LuauOutput;
pub use place::VersionType;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::http::{Executor, HttpExecutor};
use crate::poller::OperationPoller;
use std::sync::Arc;

pub struct OpenCloudClient {
    config: ClientConfig,
    executor: Arc<dyn Executor>,
    poller: OperationPoller,
}

impl OpenCloudClient {
    /// Client backed by a real [`HttpExecutor`]
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let executor = HttpExecutor::new(&config.api_key, config.request_timeout, config.retry)?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    /// Client over any executor
    pub fn with_executor(config: ClientConfig, executor: Arc<dyn Executor>) -> Self {
        let poller = OperationPoller::new(executor.clone(), config.operations_base_url())
            .with_policy(config.poll);
        Self {
            config,
            executor,
            poller,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn poller(&self) -> &OperationPoller {
        &self.poller
    }

    /// `<api base>/<api>/universes/<universe>/<rest>`
    fn universe_url(&self, api: &str, rest: &str) -> String {
        format!(
            "{}/{}/universes/{}/{}",
            self.config.api_base_url, api, self.config.universe_id, rest
        )
    }

    fn resolve_place(&self, place_id: Option<u64>) -> ClientResult<u64> {
        place_id.or(self.config.place_id).ok_or_else(|| {
            ClientError::Config(
                "place id must be given explicitly or configured as ROBLOX_PLACE_ID".into(),
            )
        })
    }
}
