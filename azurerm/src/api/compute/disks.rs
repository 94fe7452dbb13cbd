//! Managed disks, API version 2023-04-02

use serde::{Deserialize, Serialize};

use crate::api::common::{EnabledState, SubResource, Tags};
use crate::api::{ApiError, Client};
use crate::ids::ManagedDiskId;

pub const API_VERSION: &str = "2023-04-02";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Disk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<DiskSku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<DiskProperties>,
    /// Virtual machine the disk is attached to. Read-only.
    #[serde(rename = "managedBy", default, skip_serializing)]
    pub managed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskSku {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_state: Option<String>,
    pub creation_data: CreationData,
    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(rename = "diskIOPSReadWrite", skip_serializing_if = "Option::is_none")]
    pub disk_iops_read_write: Option<i64>,
    #[serde(rename = "diskMBpsReadWrite", skip_serializing_if = "Option::is_none")]
    pub disk_mbps_read_write: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_shares: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_access_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_access_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<EnabledState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bursting_enabled: Option<bool>,
    #[serde(rename = "hyperVGeneration", skip_serializing_if = "Option::is_none")]
    pub hyper_v_generation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreationData {
    pub create_option: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery_image_reference: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_sector_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_size_bytes: Option<i64>,
}

/// PATCH body; only mutable properties
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<DiskSku>,
    pub properties: DiskUpdateProperties,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskUpdateProperties {
    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(rename = "diskIOPSReadWrite", skip_serializing_if = "Option::is_none")]
    pub disk_iops_read_write: Option<i64>,
    #[serde(rename = "diskMBpsReadWrite", skip_serializing_if = "Option::is_none")]
    pub disk_mbps_read_write: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_shares: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_access_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_access_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<EnabledState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bursting_enabled: Option<bool>,
}

impl Disk {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }

    /// The owning virtual machine while it is running. A disk on a
    /// deallocated machine reports `Reserved` instead of `Attached`.
    pub fn running_vm(&self) -> Option<&str> {
        let attached = self
            .properties
            .as_ref()
            .and_then(|p| p.disk_state.as_deref())
            .is_some_and(|state| state.eq_ignore_ascii_case("Attached"));
        self.managed_by.as_deref().filter(|_| attached)
    }
}

#[derive(Clone)]
pub struct DisksClient {
    client: Client,
}

impl DisksClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &ManagedDiskId) -> Result<Disk, ApiError> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    pub async fn create_or_update(
        &self,
        id: &ManagedDiskId,
        disk: &Disk,
    ) -> Result<Option<Disk>, ApiError> {
        tracing::info!("Creating or updating managed disk {}", id.name);
        self.client.put(&id.to_string(), API_VERSION, disk).await
    }

    pub async fn update(
        &self,
        id: &ManagedDiskId,
        update: &DiskUpdate,
    ) -> Result<Option<Disk>, ApiError> {
        tracing::info!("Updating managed disk {}", id.name);
        self.client.patch(&id.to_string(), API_VERSION, update).await
    }

    pub async fn delete(&self, id: &ManagedDiskId) -> Result<(), ApiError> {
        tracing::info!("Deleting managed disk {}", id.name);
        self.client.delete(&id.to_string(), API_VERSION).await
    }
}
