use super::OpenCloudClient;
use crate::error::ClientResult;
use crate::http::ApiRequest;
use serde::{Deserialize, Serialize};
use shared::RemoteValue;

/// Which version slot a publish writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionType {
    #[default]
    Saved,
    Published,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saved => "Saved",
            Self::Published => "Published",
        }
    }
}

impl OpenCloudClient {
    /// Create a new version of the place; returns the remote's version info
    pub async fn publish_place(
        &self,
        place_id: Option<u64>,
        version_type: VersionType,
    ) -> ClientResult<RemoteValue> {
        let place_id = self.resolve_place(place_id)?;
        let url = format!(
            "{}/v1/universes/{}/places/{}/versions",
            self.config.develop_base_url, self.config.universe_id, place_id
        );
        tracing::info!(place_id, version_type = version_type.as_str(), "Publishing place");

        let request = ApiRequest::post(url).query("versionType", version_type.as_str());
        let body = self.executor.execute(&request).await?;
        Ok(body.into_value())
    }
}
