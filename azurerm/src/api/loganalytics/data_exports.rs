//! Workspace data export rules, API version 2020-08-01

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsDataExportId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<DataExportProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataExportProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_export_id: Option<String>,
    #[serde(default)]
    pub table_names: Vec<String>,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(default)]
    pub resource_id: String,
}

#[derive(Clone)]
pub struct DataExportsClient {
    client: Client,
}

impl DataExportsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsDataExportId) -> Result<DataExport, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsDataExportId,
        export: &DataExport,
    ) -> Result<Option<DataExport>, ApiError> {
        tracing::info!("Creating or updating data export {} in {}", id.name, id.workspace_name);
        self.client.put(&id.to_string(), API_VERSION, export).await
    }

    pub async fn delete(&self, id: &LogAnalyticsDataExportId) -> Result<(), ApiError> {
        tracing::info!("Deleting data export {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
