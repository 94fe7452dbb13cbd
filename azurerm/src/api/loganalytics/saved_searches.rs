//! Saved searches, API version 2020-08-01

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsSavedSearchId;

pub const API_VERSION: &str = "2020-08-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SavedSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub properties: SavedSearchProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearchProperties {
    pub category: String,
    pub display_name: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_alias: Option<String>,
    /// Comma-joined `name:type` pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<SavedSearchTag>,
}

/// Saved searches carry tags inside properties as name/value pairs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSearchTag {
    pub name: String,
    pub value: String,
}

#[derive(Clone)]
pub struct SavedSearchesClient {
    client: Client,
}

impl SavedSearchesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsSavedSearchId) -> Result<SavedSearch, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsSavedSearchId,
        search: &SavedSearch,
    ) -> Result<Option<SavedSearch>, ApiError> {
        tracing::info!("Creating or updating saved search {} in {}", id.name, id.workspace_name);
        self.client.put(&id.to_string(), API_VERSION, search).await
    }

    pub async fn delete(&self, id: &LogAnalyticsSavedSearchId) -> Result<(), ApiError> {
        tracing::info!("Deleting saved search {} in {}", id.name, id.workspace_name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
