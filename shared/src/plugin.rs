//! Studio plugin wire protocol
//!
//! The plugin never accepts inbound connections. It polls
//! `GET /plugin_command` for work and pushes outcomes back on
//! `POST /plugin_report_result`; its output window is forwarded on
//! `POST /receive_studio_logs`.

use crate::value::RemoteValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A command handed to the plugin.
///
/// `request_id` is absent for fire-and-forget commands; the plugin only
/// reports back when one is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub data: RemoteValue,
}

impl PluginCommand {
    pub fn new(action: impl Into<String>, data: RemoteValue) -> Self {
        Self {
            request_id: None,
            action: action.into(),
            data,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Body of `POST /plugin_report_result`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResultPayload {
    pub request_id: String,
    #[serde(default)]
    pub result: RemoteValue,
}

/// Response to a result report. Sent for known and unknown ids alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAck {
    pub status: String,
    pub request_id: String,
}

impl ReportAck {
    pub fn success(request_id: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            request_id: request_id.into(),
        }
    }
}

/// One line of studio output as forwarded by the plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioLogEntry {
    pub message: String,
    #[serde(default = "default_log_type")]
    pub log_type: String,
    /// Seconds since the unix epoch, as reported by studio
    #[serde(default)]
    pub timestamp: f64,
}

fn default_log_type() -> String {
    "MessageOutput".to_string()
}

/// A forwarded log line stamped with the time the relay received it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioLogRecord {
    #[serde(flatten)]
    pub entry: StudioLogEntry,
    pub received_at: DateTime<Utc>,
}

/// Response to `POST /receive_studio_logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsAck {
    pub status: String,
    pub received: usize,
}

impl LogsAck {
    pub fn success(received: usize) -> Self {
        Self {
            status: "success".to_string(),
            received,
        }
    }
}
