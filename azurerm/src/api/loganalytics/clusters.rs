//! Dedicated Log Analytics clusters, API version 2022-10-01

use serde::{Deserialize, Serialize};

use crate::api::common::Tags;
use crate::api::{ApiError, Client};
use crate::ids::LogAnalyticsClusterId;

pub const API_VERSION: &str = "2022-10-01";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<ClusterSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ClusterProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSku {
    pub name: String,
    pub capacity: i64,
}

impl ClusterSku {
    pub fn capacity_reservation(capacity: i64) -> Self {
        Self {
            name: "CapacityReservation".to_string(),
            capacity,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_vault_properties: Option<KeyVaultProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    #[serde(default)]
    pub key_vault_uri: String,
    #[serde(default)]
    pub key_name: String,
    #[serde(default)]
    pub key_version: String,
}

/// PATCH body
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ClusterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<ClusterSku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ClusterPatchProperties>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPatchProperties {
    pub key_vault_properties: KeyVaultProperties,
}

impl Cluster {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }

    /// The configured customer-managed key, if any part of it is set
    pub fn key_vault_properties(&self) -> Option<&KeyVaultProperties> {
        self.properties
            .as_ref()
            .and_then(|p| p.key_vault_properties.as_ref())
            .filter(|k| !k.key_vault_uri.is_empty() || !k.key_name.is_empty())
    }
}

#[derive(Clone)]
pub struct ClustersClient {
    client: Client,
}

impl ClustersClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &LogAnalyticsClusterId) -> Result<Cluster, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &LogAnalyticsClusterId,
        cluster: &Cluster,
    ) -> Result<Option<Cluster>, ApiError> {
        tracing::info!("Creating or updating cluster {}", id.name);
        self.client.put(&id.to_string(), API_VERSION, cluster).await
    }

    pub async fn update(
        &self,
        id: &LogAnalyticsClusterId,
        patch: &ClusterPatch,
    ) -> Result<Option<Cluster>, ApiError> {
        tracing::info!("Updating cluster {}", id.name);
        self.client.patch(&id.to_string(), API_VERSION, patch).await
    }

    pub async fn delete(&self, id: &LogAnalyticsClusterId) -> Result<(), ApiError> {
        tracing::info!("Deleting cluster {}", id.name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
