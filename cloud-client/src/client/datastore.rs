use super::OpenCloudClient;
use crate::error::{ClientError, ClientResult, Lookup};
use crate::http::{ApiRequest, ResponseBody};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use shared::RemoteValue;
use std::collections::BTreeMap;
use std::time::Duration;

const DATASTORE_API: &str = "datastores/v1";
const ENTRY_PATH: &str = "standard-datastores/datastore/entries/entry";
const ENTRY_READ_TIMEOUT: Duration = Duration::from_secs(15);

fn default_scope() -> String {
    "global".to_string()
}

/// Identifies one entry in a standard datastore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRef {
    pub datastore: String,
    pub key: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl EntryRef {
    pub fn new(datastore: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            datastore: datastore.into(),
            key: key.into(),
            scope: default_scope(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query("datastoreName", &self.datastore)
            .query("scope", &self.scope)
            .query("entryKey", &self.key)
    }
}

/// A write to a datastore entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEntry {
    #[serde(flatten)]
    pub entry: EntryRef,
    pub value: RemoteValue,
    /// Only write if the current version matches
    #[serde(default)]
    pub match_version: Option<String>,
    /// Only write if the entry does not exist yet
    #[serde(default)]
    pub exclusive_create: bool,
    #[serde(default)]
    pub user_ids: Option<Vec<u64>>,
    #[serde(default)]
    pub attributes: Option<RemoteValue>,
}

impl SetEntry {
    /// Base64 `roblox-entry-metadata` header value, when there is metadata
    fn metadata_header(&self) -> ClientResult<Option<String>> {
        let mut metadata = BTreeMap::new();
        if let Some(ids) = self.user_ids.as_ref().filter(|ids| !ids.is_empty()) {
            metadata.insert("roblox-entry-userids", serde_json::to_string(ids)?);
        }
        if let Some(attrs) = self.attributes.as_ref().filter(|a| a.is_truthy()) {
            metadata.insert("roblox-entry-attributes", serde_json::to_string(attrs)?);
        }
        if metadata.is_empty() {
            return Ok(None);
        }
        let encoded = serde_json::to_vec(&metadata)?;
        Ok(Some(STANDARD.encode(encoded)))
    }
}

/// One page of datastore names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatastorePage {
    pub datastores: Vec<String>,
    pub next_page_cursor: Option<String>,
}

impl DatastorePage {
    fn from_body(body: &ResponseBody) -> ClientResult<Self> {
        let value = body.as_json().ok_or_else(|| {
            ClientError::InvalidResponse("datastore listing is not JSON".into())
        })?;
        let datastores = value
            .field("datastores")
            .and_then(|d| d.as_list())
            .unwrap_or_default()
            .iter()
            .filter_map(|d| d.field("name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect();
        let next_page_cursor = value
            .field("nextPageCursor")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(Self {
            datastores,
            next_page_cursor,
        })
    }
}

impl OpenCloudClient {
    pub async fn list_datastores(
        &self,
        prefix: Option<&str>,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> ClientResult<DatastorePage> {
        let url = self.universe_url(DATASTORE_API, "standard-datastores");
        let request = ApiRequest::get(url)
            .query_opt("prefix", prefix.filter(|p| !p.is_empty()))
            .query_opt("limit", limit.filter(|l| *l > 0))
            .query_opt("cursor", cursor.filter(|c| !c.is_empty()));
        let body = self.executor.execute(&request).await?;
        DatastorePage::from_body(&body)
    }

    /// Read an entry. A missing entry is [`Lookup::Absent`], not an error.
    pub async fn get_entry(&self, entry: &EntryRef) -> ClientResult<Lookup<ResponseBody>> {
        let request = entry
            .apply(ApiRequest::get(self.universe_url(DATASTORE_API, ENTRY_PATH)))
            .timeout(ENTRY_READ_TIMEOUT);
        let found = self.executor.lookup(&request).await?;
        if found.is_absent() {
            tracing::info!(datastore = %entry.datastore, key = %entry.key, "Datastore entry not found");
        }
        Ok(found)
    }

    /// Write an entry; returns the remote's version description
    pub async fn set_entry(&self, write: &SetEntry) -> ClientResult<RemoteValue> {
        let bytes = serde_json::to_vec(&write.value)?;
        let mut request = write
            .entry
            .apply(ApiRequest::post(self.universe_url(DATASTORE_API, ENTRY_PATH)))
            .raw(bytes, "application/json")
            .query_opt("matchVersion", write.match_version.as_deref());
        if write.exclusive_create {
            request = request.query("exclusiveCreate", "true");
        }
        if let Some(metadata) = write.metadata_header()? {
            request = request.header("roblox-entry-metadata", metadata);
        }

        let body = self.executor.execute(&request).await?;
        tracing::info!(datastore = %write.entry.datastore, key = %write.entry.key, "Datastore entry written");
        Ok(body.into_value())
    }

    /// Delete an entry. Deleting a missing entry succeeds with [`Lookup::Absent`].
    pub async fn delete_entry(&self, entry: &EntryRef) -> ClientResult<Lookup<()>> {
        let request = entry.apply(ApiRequest::delete(self.universe_url(DATASTORE_API, ENTRY_PATH)));
        let deleted = self.executor.lookup(&request).await?.map(|_| ());
        tracing::info!(
            datastore = %entry.datastore,
            key = %entry.key,
            existed = !deleted.is_absent(),
            "Datastore entry deleted"
        );
        Ok(deleted)
    }
}
