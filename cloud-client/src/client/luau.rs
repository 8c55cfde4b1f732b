use super::OpenCloudClient;
use crate::error::{ClientError, ClientResult};
use crate::http::{ApiRequest, ResponseBody};
use shared::{OperationOutcome, OperationState, RemoteValue};
use serde_json::json;

/// What a finished script printed, interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum LuauOutput {
    /// The script printed nothing
    Empty,
    /// The last printed line was a JSON object
    Json(RemoteValue),
    /// All printed lines, newline-joined
    Text(String),
}

impl LuauOutput {
    /// Interpret captured output lines.
    ///
    /// Scripts return structured data by printing a JSON object as their
    /// final line; anything else is plain text.
    pub fn from_messages(messages: Vec<String>) -> Self {
        let Some(last) = messages.last() else {
            return Self::Empty;
        };
        let trimmed = last.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return Self::Json(RemoteValue::from(value));
            }
        }
        Self::Text(messages.join("\n"))
    }

    /// Silent scripts report `{}`, like other "nothing to report" results
    pub fn into_value(self) -> RemoteValue {
        match self {
            Self::Empty => RemoteValue::empty_map(),
            Self::Json(v) => v,
            Self::Text(s) => RemoteValue::text(s),
        }
    }
}

impl OpenCloudClient {
    /// Run a script in a headless server for the place and wait for its output.
    #[tracing::instrument(skip(self, script))]
    pub async fn execute_luau(&self, script: &str, place_id: Option<u64>) -> ClientResult<LuauOutput> {
        let place_id = self.resolve_place(place_id)?;

        let url = self.universe_url(
            "cloud/v2",
            &format!("places/{place_id}/luau-execution-session-tasks"),
        );
        let body = json!({
            "script": script,
            "timeout": format!("{}s", self.config.luau_timeout.as_secs()),
        });
        let created = self
            .executor
            .execute(&ApiRequest::post(url).json(body))
            .await?;

        let path = created
            .as_json()
            .and_then(|v| v.field("path"))
            .and_then(|p| p.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::InvalidResponse("script task response has no operation path".into())
            })?;
        tracing::info!(operation = %path, "Script task created");

        let deadline = self.config.luau_timeout + self.config.luau_poll_grace;
        let terminal = self.poller.poll(&path, deadline).await?;

        match terminal.status.outcome() {
            Some(OperationOutcome::Complete(_)) => {}
            Some(OperationOutcome::Failed(error)) => {
                return Err(ClientError::OperationFailed {
                    path,
                    state: OperationState::Failed,
                    error,
                });
            }
            Some(OperationOutcome::Cancelled) => {
                return Err(ClientError::OperationFailed {
                    path,
                    state: OperationState::Cancelled,
                    error: RemoteValue::Null,
                });
            }
            None => {
                return Err(ClientError::InvalidResponse(format!(
                    "operation {path} reported terminal without an outcome"
                )));
            }
        }

        let messages = self.task_log_messages(&path).await?;
        tracing::info!(operation = %path, lines = messages.len(), "Script task complete");
        Ok(LuauOutput::from_messages(messages))
    }

    async fn task_log_messages(&self, path: &str) -> ClientResult<Vec<String>> {
        let url = format!("{}/logs", self.poller.status_url(path));
        let body = self.executor.execute(&ApiRequest::get(url)).await?;
        Ok(collect_messages(&body))
    }
}

fn collect_messages(body: &ResponseBody) -> Vec<String> {
    let Some(chunks) = body
        .as_json()
        .and_then(|v| v.field("luauExecutionSessionTaskLogs"))
        .and_then(|v| v.as_list())
    else {
        return Vec::new();
    };

    chunks
        .iter()
        .filter_map(|chunk| chunk.field("messages").and_then(|m| m.as_list()))
        .flatten()
        .map(|m| match m.as_str() {
            Some(s) => s.to_string(),
            None => m.to_string(),
        })
        .collect()
}
