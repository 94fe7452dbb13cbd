//! Linked services, API version 2020-08-01

use serde::{Deserialize, Serialize};

use crate::api::common::Tags;
use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsLinkedServiceId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkedService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<LinkedServiceProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkedServiceProperties {
    /// Automation account with read access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Cluster with write access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_access_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl LinkedService {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[derive(Clone)]
pub struct LinkedServicesClient {
    client: Client,
}

impl LinkedServicesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsLinkedServiceId) -> Result<LinkedService, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsLinkedServiceId,
        service: &LinkedService,
    ) -> Result<Option<LinkedService>, ApiError> {
        tracing::info!("Creating or updating linked service {} in {}", id.name, id.workspace_name);
        self.client.put(&id.to_string(), API_VERSION, service).await
    }

    pub async fn delete(&self, id: &LogAnalyticsLinkedServiceId) -> Result<(), ApiError> {
        tracing::info!("Deleting linked service {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
