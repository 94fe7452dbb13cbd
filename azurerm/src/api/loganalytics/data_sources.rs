//! Workspace data sources, API version 2020-08-01
//!
//! The payload shape depends on `kind`, so the body is modelled as an
//! adjacently tagged enum and decoded in one step.

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsDataSourceId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(flatten)]
    pub properties: DataSourceProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "properties")]
pub enum DataSourceProperties {
    WindowsEvent(WindowsEventProperties),
    WindowsPerformanceCounter(WindowsPerformanceCounterProperties),
}

impl DataSourceProperties {
    pub fn kind(&self) -> &'static str {
        match self {
            DataSourceProperties::WindowsEvent(_) => "WindowsEvent",
            DataSourceProperties::WindowsPerformanceCounter(_) => "WindowsPerformanceCounter",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowsEventProperties {
    pub event_log_name: String,
    #[serde(default)]
    pub event_types: Vec<WindowsEventType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowsEventType {
    pub event_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowsPerformanceCounterProperties {
    pub object_name: String,
    pub instance_name: String,
    pub counter_name: String,
    pub interval_seconds: i64,
}

#[derive(Clone)]
pub struct DataSourcesClient {
    client: Client,
}

impl DataSourcesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsDataSourceId) -> Result<DataSource, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsDataSourceId,
        source: &DataSource,
    ) -> Result<Option<DataSource>, ApiError> {
        tracing::info!(
            "Creating or updating {} data source {} in {}",
            source.properties.kind(),
            id.name,
            id.workspace_name
        );
        self.client.put(&id.to_string(), API_VERSION, source).await
    }

    pub async fn delete(&self, id: &LogAnalyticsDataSourceId) -> Result<(), ApiError> {
        tracing::info!("Deleting data source {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
