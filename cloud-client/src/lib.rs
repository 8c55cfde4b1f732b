//! Cloud client with resilient request execution
//!
//! ## Scope
//!
//! - [`HttpExecutor`]: one logical HTTP request with rate-limit aware
//!   retry and network-failure backoff
//! - [`OperationPoller`]: waits for a long-running operation to reach a
//!   terminal state within a deadline
//! - [`OpenCloudClient`]: typed calls (script execution, datastores,
//!   place publishing) built on the two above
//!
//! ```ignore
//! use cloud_client::{ClientConfig, OpenCloudClient};
//!
//! let client = OpenCloudClient::new(ClientConfig::new(api_key, universe_id).with_place_id(place))?;
//! let output = client.execute_luau("print(workspace.Name)", None).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod poller;

pub use client::{DatastorePage, EntryRef, LuauOutput, OpenCloudClient, SetEntry, VersionType};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, Lookup};
pub use http::{ApiRequest, Executor, HttpExecutor, ResponseBody, RetryPolicy};
pub use poller::{OperationPoller, PollPolicy, TerminalStatus};
