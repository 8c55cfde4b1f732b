//! Remote execution facade
//!
//! One entry point for every remote the relay can drive. Studio calls go
//! through the [`Bridge`]; cloud calls go through the [`OpenCloudClient`].
//! Every outcome is either a [`RemoteValue`] or an [`ExecuteError`] that
//! converts into an [`AppError`] with the structured payload in `details`.

use crate::bridge::{Bridge, BridgeError};
use cloud_client::{ClientError, EntryRef, Lookup, OpenCloudClient, SetEntry, VersionType};
use serde::Deserialize;
use shared::{AppError, ErrorCode, PluginCommand, RemoteValue};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STUDIO_TIMEOUT: Duration = Duration::from_secs(20);
pub const MIN_STUDIO_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_STUDIO_TIMEOUT: Duration = Duration::from_secs(300);

/// A call against one of the remotes, tagged by `target`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum RemoteCall {
    /// Run one command in the studio plugin and wait for its result
    Studio {
        action: String,
        #[serde(default)]
        data: RemoteValue,
        #[serde(default)]
        timeout_secs: Option<f64>,
    },
    /// Queue commands for the plugin without waiting on results
    StudioBatch { commands: Vec<PluginCommand> },
    Cloud { call: CloudCall },
}

/// Cloud API operations, tagged by `op`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CloudCall {
    Luau {
        script: String,
        #[serde(default)]
        place_id: Option<u64>,
    },
    ListDatastores {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        cursor: Option<String>,
    },
    GetEntry(EntryRef),
    SetEntry(SetEntry),
    DeleteEntry(EntryRef),
    PublishPlace {
        #[serde(default)]
        place_id: Option<u64>,
        #[serde(default)]
        version_type: VersionType,
    },
}

impl RemoteCall {
    /// Short label for logs
    pub fn operation(&self) -> &str {
        match self {
            Self::Studio { action, .. } => action,
            Self::StudioBatch { .. } => "studio_batch",
            Self::Cloud { call } => match call {
                CloudCall::Luau { .. } => "luau",
                CloudCall::ListDatastores { .. } => "list_datastores",
                CloudCall::GetEntry(_) => "get_entry",
                CloudCall::SetEntry(_) => "set_entry",
                CloudCall::DeleteEntry(_) => "delete_entry",
                CloudCall::PublishPlace { .. } => "publish_place",
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Cloud(#[from] ClientError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("cloud execution is not configured")]
    CloudUnavailable,
}

impl From<ExecuteError> for AppError {
    fn from(err: ExecuteError) -> Self {
        let message = err.to_string();
        match err {
            ExecuteError::Bridge(bridge) => match bridge {
                BridgeError::Timeout {
                    request_id,
                    action,
                    elapsed,
                } => AppError::timeout(format!("studio '{action}'"), elapsed.as_secs_f64())
                    .with_detail("request_id", request_id)
                    .with_detail("action", action),
                BridgeError::UnknownCorrelation { request_id } => {
                    AppError::with_message(ErrorCode::UnknownCorrelation, message)
                        .with_detail("request_id", request_id)
                }
                BridgeError::Abandoned { request_id } => AppError::remote_unavailable(message)
                    .with_detail("request_id", request_id),
            },
            ExecuteError::Cloud(client) => match client {
                ClientError::Transport { url, attempts, .. } => {
                    AppError::with_message(ErrorCode::TransportError, message)
                        .with_detail("url", url)
                        .with_detail("attempts", attempts)
                }
                ClientError::RateLimited { url, attempts } => {
                    AppError::with_message(ErrorCode::RateLimited, message)
                        .with_detail("url", url)
                        .with_detail("attempts", attempts)
                }
                ClientError::Remote { status, body, .. } => {
                    AppError::with_message(ErrorCode::RemoteError, message)
                        .with_detail("status", status)
                        .with_detail("body", body.into_value().to_json())
                }
                ClientError::Timeout { context, elapsed } => {
                    AppError::timeout(context, elapsed.as_secs_f64())
                }
                ClientError::OperationFailed { path, state, error } => {
                    AppError::with_message(ErrorCode::OperationFailed, message)
                        .with_detail("path", path)
                        .with_detail("state", state.as_str())
                        .with_detail("error", error.to_json())
                }
                ClientError::InvalidResponse(_) => {
                    AppError::with_message(ErrorCode::InvalidResponse, message)
                }
                ClientError::Config(_) => AppError::config(message),
                ClientError::Serialization(_) => AppError::internal(message),
            },
            ExecuteError::CloudUnavailable => AppError::config(message),
        }
    }
}

/// Clamp a caller-supplied studio wait into the allowed window
pub fn studio_timeout(requested_secs: Option<f64>, default: Duration) -> Duration {
    match requested_secs.filter(|s| s.is_finite()) {
        Some(secs) => Duration::from_secs_f64(secs.clamp(
            MIN_STUDIO_TIMEOUT.as_secs_f64(),
            MAX_STUDIO_TIMEOUT.as_secs_f64(),
        )),
        None => default,
    }
}

pub struct RemoteExecutor {
    bridge: Arc<Bridge>,
    cloud: Option<Arc<OpenCloudClient>>,
    studio_timeout: Duration,
}

impl RemoteExecutor {
    pub fn new(bridge: Arc<Bridge>, cloud: Option<Arc<OpenCloudClient>>) -> Self {
        Self {
            bridge,
            cloud,
            studio_timeout: DEFAULT_STUDIO_TIMEOUT,
        }
    }

    pub fn with_studio_timeout(mut self, timeout: Duration) -> Self {
        self.studio_timeout = timeout;
        self
    }

    pub fn cloud_configured(&self) -> bool {
        self.cloud.is_some()
    }

    #[tracing::instrument(skip_all, fields(operation = %call.operation()))]
    pub async fn execute(&self, call: RemoteCall) -> Result<RemoteValue, ExecuteError> {
        let result = match call {
            RemoteCall::Studio {
                action,
                data,
                timeout_secs,
            } => {
                let timeout = studio_timeout(timeout_secs, self.studio_timeout);
                Ok(self.bridge.submit(action, data, timeout).await?)
            }
            RemoteCall::StudioBatch { commands } => {
                let queued = commands.len();
                let queue_length = self.bridge.enqueue_batch(commands);
                Ok(RemoteValue::from(json!({
                    "queued": queued,
                    "queue_length": queue_length,
                })))
            }
            RemoteCall::Cloud { call } => self.execute_cloud(call).await,
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Remote call failed");
        }
        result
    }

    async fn execute_cloud(&self, call: CloudCall) -> Result<RemoteValue, ExecuteError> {
        let client = self.cloud.as_ref().ok_or(ExecuteError::CloudUnavailable)?;

        let value = match call {
            CloudCall::Luau { script, place_id } => {
                client.execute_luau(&script, place_id).await?.into_value()
            }
            CloudCall::ListDatastores {
                prefix,
                limit,
                cursor,
            } => {
                let page = client
                    .list_datastores(prefix.as_deref(), limit, cursor.as_deref())
                    .await?;
                RemoteValue::from(serde_json::to_value(page).map_err(ClientError::from)?)
            }
            CloudCall::GetEntry(entry) => match client.get_entry(&entry).await? {
                Lookup::Found(body) => RemoteValue::from(json!({
                    "found": true,
                    "value": body.into_value().to_json(),
                })),
                Lookup::Absent => RemoteValue::from(json!({"found": false, "value": null})),
            },
            CloudCall::SetEntry(write) => client.set_entry(&write).await?,
            CloudCall::DeleteEntry(entry) => {
                let existed = !client.delete_entry(&entry).await?.is_absent();
                RemoteValue::from(json!({"deleted": true, "existed": existed}))
            }
            CloudCall::PublishPlace {
                place_id,
                version_type,
            } => client.publish_place(place_id, version_type).await?,
        };
        Ok(value)
    }
}
