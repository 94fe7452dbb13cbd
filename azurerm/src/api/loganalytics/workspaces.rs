//! Log Analytics workspaces, API version 2022-10-01

use serde::{Deserialize, Serialize};

use crate::api::common::{EnabledState, Tags};
use crate::api::{ApiError, ApiQueryParams, Client};
use crate::ids::LogAnalyticsWorkspaceId;

pub const API_VERSION: &str = "2022-10-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<WorkspaceProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// The workspace GUID agents use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<WorkspaceSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_capping: Option<WorkspaceCapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network_access_for_ingestion: Option<EnabledState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network_access_for_query: Option<EnabledState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<WorkspaceFeatures>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSku {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_reservation_level: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceCapping {
    /// `-1` means unlimited
    pub daily_quota_gb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFeatures {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_local_auth: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedKeys {
    pub primary_shared_key: Option<String>,
    pub secondary_shared_key: Option<String>,
}

impl Workspace {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[derive(Clone)]
pub struct WorkspacesClient {
    client: Client,
}

impl WorkspacesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsWorkspaceId) -> Result<Workspace, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsWorkspaceId,
        workspace: &Workspace,
    ) -> Result<Option<Workspace>, ApiError> {
        tracing::info!("Creating or updating workspace {}", id.name);
        self.client.put(&id.to_string(), API_VERSION, workspace).await
    }

    /// `force` skips the soft-delete recycle bin
    pub async fn delete(&self, id: &LogAnalyticsWorkspaceId, force: bool) -> Result<(), ApiError> {
        tracing::info!("Deleting workspace {} (force: {})", id.name, force);
        let params = ApiQueryParams::api_version(API_VERSION).add("force", force);
        self.client.delete_with_params(&id.to_string(), params).await
    }

    pub async fn shared_keys(&self, id: &LogAnalyticsWorkspaceId) -> Result<SharedKeys, ApiError> {
        self.client
            .post(&format!("{}/sharedKeys", id), API_VERSION)
            .await
    }
}
