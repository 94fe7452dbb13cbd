//! Linked storage accounts, API version 2020-08-01

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsLinkedStorageAccountId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkedStorageAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<LinkedStorageAccountProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkedStorageAccountProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_type: Option<String>,
    #[serde(default)]
    pub storage_account_ids: Vec<String>,
}

#[derive(Clone)]
pub struct LinkedStorageAccountsClient {
    client: Client,
}

impl LinkedStorageAccountsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        id: &LogAnalyticsLinkedStorageAccountId,
    ) -> Result<LinkedStorageAccount, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsLinkedStorageAccountId,
        account: &LinkedStorageAccount,
    ) -> Result<Option<LinkedStorageAccount>, ApiError> {
        tracing::info!(
            "Creating or updating linked storage account {} in {}",
            id.name,
            id.workspace_name
        );
        self.client.put(&id.to_string(), API_VERSION, account).await
    }

    pub async fn delete(&self, id: &LogAnalyticsLinkedStorageAccountId) -> Result<(), ApiError> {
        tracing::info!("Deleting linked storage account {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
