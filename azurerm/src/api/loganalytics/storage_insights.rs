//! Storage insight configs, API version 2020-08-01

use serde::{Deserialize, Serialize};

use crate::api::common::Tags;
use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsStorageInsightsId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageInsight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageInsightProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageInsightProperties {
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    pub storage_account: StorageAccount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageAccount {
    pub id: String,
    /// Write-only; the service never returns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Clone)]
pub struct StorageInsightsClient {
    client: Client,
}

impl StorageInsightsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsStorageInsightsId) -> Result<StorageInsight, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsStorageInsightsId,
        insight: &StorageInsight,
    ) -> Result<Option<StorageInsight>, ApiError> {
        tracing::info!("Creating or updating storage insights {} in {}", id.name, id.workspace_name);
        self.client.put(&id.to_string(), API_VERSION, insight).await
    }

    pub async fn delete(&self, id: &LogAnalyticsStorageInsightsId) -> Result<(), ApiError> {
        tracing::info!("Deleting storage insights {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
