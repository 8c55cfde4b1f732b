//! Cloud long-running operation status
//!
//! The cloud API reports asynchronous work through an operation resource
//! fetched by path. Its `state` label is not always consistent with its
//! `error` payload, so terminal detection looks at both.

use crate::value::RemoteValue;
use serde::{Deserialize, Serialize};

/// Lifecycle label reported by the operation resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    #[serde(alias = "QUEUED")]
    Pending,
    #[serde(alias = "PROCESSING")]
    Running,
    Complete,
    Failed,
    Cancelled,
    /// Any label this client does not recognise; never terminal
    #[serde(other)]
    Unknown,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an operation resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<OperationState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RemoteValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RemoteValue>,
}

/// How a terminal operation ended
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Complete(Option<RemoteValue>),
    Failed(RemoteValue),
    Cancelled,
}

impl OperationStatus {
    /// Parse a status body. Unknown fields are ignored.
    pub fn from_value(value: &RemoteValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.to_json())
    }

    /// Error payload, if one is present and non-empty
    pub fn error_payload(&self) -> Option<&RemoteValue> {
        self.error.as_ref().filter(|e| e.is_truthy())
    }

    /// Terminal when the state label is terminal, or when an error payload
    /// is present regardless of the label.
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(|s| s.is_terminal()) || self.error_payload().is_some()
    }

    /// State with an error payload folded in as `Failed`
    pub fn effective_state(&self) -> Option<OperationState> {
        match self.state {
            Some(s) if s.is_terminal() => Some(s),
            _ if self.error_payload().is_some() => Some(OperationState::Failed),
            other => other,
        }
    }

    /// Outcome of a terminal operation; `None` while still in flight
    pub fn outcome(&self) -> Option<OperationOutcome> {
        match self.effective_state()? {
            OperationState::Complete => match self.error_payload() {
                Some(err) => Some(OperationOutcome::Failed(err.clone())),
                None => Some(OperationOutcome::Complete(self.response.clone())),
            },
            OperationState::Failed => Some(OperationOutcome::Failed(
                self.error.clone().unwrap_or_default(),
            )),
            OperationState::Cancelled => Some(OperationOutcome::Cancelled),
            _ => None,
        }
    }
}
