//! Managed disk resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_validating_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{IntBetween, IntInSlice, StringInSlice};

use crate::api::common::{EnabledState, SubResource};
use crate::api::compute::disks::{
    CreationData, Disk, DiskProperties, DiskSku, DiskUpdate,
};
use crate::api::compute::DisksClient;
use crate::ids::{ManagedDiskId, ResourceId, StorageAccountId};
use crate::poll::{Refreshed, StateWaiter, Transitions};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, location_attribute, location_for_state, not_configured, optional_bool,
    optional_i64, optional_string, parse_id, put_bool, put_i64, put_string, put_tags, read_within,
    require_absent, required_string, resource_group_name_attribute, state_id, tags, tags_attribute,
    wait_error, wait_for_deletion, Timeouts, POLL_INTERVAL,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_managed_disk";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

pub const STORAGE_ACCOUNT_TYPES: [&str; 7] = [
    "Standard_LRS",
    "StandardSSD_ZRS",
    "Premium_LRS",
    "PremiumV2_LRS",
    "Premium_ZRS",
    "StandardSSD_LRS",
    "UltraSSD_LRS",
];

pub const CREATE_OPTIONS: [&str; 7] = [
    "Copy",
    "Empty",
    "FromImage",
    "Import",
    "ImportSecure",
    "Restore",
    "Upload",
];

const NETWORK_ACCESS_POLICIES: [&str; 3] = ["AllowAll", "AllowPrivate", "DenyAll"];

/// Disks at or below this size cannot grow past it while attached
const DETACH_BOUNDARY_GB: i64 = 4096;

fn provisioning() -> Transitions {
    Transitions::new(&["Creating", "Updating", "Accepted"], &["Succeeded"])
        .failed(&["Failed", "Canceled"])
}

fn canonical_storage_account_type(value: &str) -> String {
    STORAGE_ACCOUNT_TYPES
        .iter()
        .find(|t| t.eq_ignore_ascii_case(value))
        .map(|t| t.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn supports_performance_settings(storage_account_type: &str) -> bool {
    storage_account_type.eq_ignore_ascii_case("UltraSSD_LRS")
        || storage_account_type == "PremiumV2_LRS"
}

fn is_premium(storage_account_type: &str) -> bool {
    matches!(storage_account_type, "Premium_LRS" | "Premium_ZRS")
}

/// True while the value is still unknown at plan time
fn pending(config: &DynamicValue, name: &str) -> bool {
    config
        .get_value(&AttributePath::new(name))
        .is_some_and(|v| v.is_unknown())
}

#[derive(Default)]
pub struct ManagedDiskResource {
    client: Option<DisksClient>,
    subscription_id: String,
}

impl ManagedDiskResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(subscription_id: impl Into<String>, client: DisksClient) -> Self {
        Self {
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn client(&self) -> Result<&DisksClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        let force_new_string = |name: &str, description: &str| -> Attribute {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .plan_modifier(Box::new(RequiresReplace))
                .build()
        };
        let at_least_one = |name: &str, description: &str| -> Attribute {
            AttributeBuilder::new(name, AttributeType::Number)
                .description(description)
                .optional()
                .computed()
                .validator(Box::new(IntBetween::new(1, i64::MAX)))
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Manages a managed disk")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the managed disk")
                    .required()
                    .validator(Box::new(tfplug::validator::StringNotEmpty))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(location_attribute())
            .attribute(resource_group_name_attribute())
            .attribute(
                AttributeBuilder::new("storage_account_type", AttributeType::String)
                    .description("Disk SKU, e.g. Premium_LRS")
                    .required()
                    .validator(Box::new(
                        StringInSlice::new(&STORAGE_ACCOUNT_TYPES).ignore_case(),
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("create_option", AttributeType::String)
                    .description("How the disk is populated")
                    .required()
                    .validator(Box::new(StringInSlice::new(&CREATE_OPTIONS)))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("logical_sector_size", AttributeType::Number)
                    .description("Sector size in bytes for Ultra and Premium v2 disks")
                    .optional()
                    .computed()
                    .validator(Box::new(IntInSlice::new(&[512, 4096])))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_uri", AttributeType::String)
                    .description("VHD to import")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(force_new_string(
                "source_resource_id",
                "Snapshot or disk to copy or restore from",
            ))
            .attribute(
                AttributeBuilder::new("storage_account_id", AttributeType::String)
                    .description("Storage account holding the imported VHD")
                    .optional()
                    .validator(validate::resource_id::<StorageAccountId>())
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(force_new_string(
                "image_reference_id",
                "Platform image to create the disk from",
            ))
            .attribute(force_new_string(
                "gallery_image_reference_id",
                "Shared gallery image version to create the disk from",
            ))
            .attribute(
                AttributeBuilder::new("os_type", AttributeType::String)
                    .description("Windows or Linux")
                    .optional()
                    .validator(Box::new(StringInSlice::new(&["Windows", "Linux"])))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_size_gb", AttributeType::Number)
                    .description("Size in GB; disks can grow but never shrink")
                    .optional()
                    .computed()
                    .validator(Box::new(IntBetween::new(1, 65536)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("upload_size_bytes", AttributeType::Number)
                    .description("Size of the upload, for create_option Upload")
                    .optional()
                    .validator(Box::new(IntBetween::new(1, i64::MAX)))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(at_least_one(
                "disk_iops_read_write",
                "Provisioned IOPS for Ultra and Premium v2 disks",
            ))
            .attribute(at_least_one(
                "disk_mbps_read_write",
                "Provisioned throughput in MB/s for Ultra and Premium v2 disks",
            ))
            .attribute(
                AttributeBuilder::new("network_access_policy", AttributeType::String)
                    .description("AllowAll, AllowPrivate or DenyAll")
                    .optional()
                    .validator(Box::new(StringInSlice::new(&NETWORK_ACCESS_POLICIES)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_access_id", AttributeType::String)
                    .description("Disk access resource, when the policy is AllowPrivate")
                    .optional()
                    .validator(validate::arm_resource_id())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_network_access_enabled", AttributeType::Bool)
                    .description("Defaults to true")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tier", AttributeType::String)
                    .description("Performance tier of a Premium disk")
                    .optional()
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_shares", AttributeType::Number)
                    .description("Number of VMs the disk can attach to at once")
                    .optional()
                    .computed()
                    .validator(Box::new(IntBetween::new(2, 10)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("hyper_v_generation", AttributeType::String)
                    .description("V1 or V2")
                    .optional()
                    .validator(Box::new(StringInSlice::new(&["V1", "V2"])))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("on_demand_bursting_enabled", AttributeType::Bool)
                    .description("Enables bursting beyond the provisioned target")
                    .optional()
                    .build(),
            )
            .attribute(force_new_string("zone", "Availability zone"))
            .attribute(tags_attribute())
            .build()
    }

    /// Checks that need more than one attribute. Values still unknown at plan
    /// time are skipped; `create` runs these again with the final config.
    pub(crate) fn check(config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];
        let mut fail = |summary: &str, detail: &str| {
            diagnostics.push(Diagnostic::error(summary, detail));
        };
        let missing = |name: &str| !pending(config, name) && optional_string(config, name).is_none();
        let missing_number =
            |name: &str| !pending(config, name) && optional_i64(config, name).is_none();

        match optional_string(config, "create_option").as_deref() {
            Some("Import" | "ImportSecure") => {
                if missing("source_uri") {
                    fail(
                        "Missing source_uri",
                        "`source_uri` must be specified when `create_option` is set to `Import` or `ImportSecure`",
                    );
                }
                if missing("storage_account_id") {
                    fail(
                        "Missing storage_account_id",
                        "`storage_account_id` must be specified when `create_option` is set to `Import` or `ImportSecure`",
                    );
                }
            }
            Some("Copy" | "Restore") if missing("source_resource_id") => fail(
                "Missing source_resource_id",
                "`source_resource_id` must be specified when `create_option` is set to `Copy` or `Restore`",
            ),
            Some("FromImage")
                if missing("image_reference_id") && missing("gallery_image_reference_id") =>
            {
                fail(
                    "Missing image reference",
                    "`image_reference_id` or `gallery_image_reference_id` must be specified when `create_option` is set to `FromImage`",
                )
            }
            Some("Upload") if missing_number("upload_size_bytes") => fail(
                "Missing upload_size_bytes",
                "`upload_size_bytes` must be specified when `create_option` is set to `Upload`",
            ),
            _ => {}
        }

        if optional_string(config, "image_reference_id").is_some()
            && optional_string(config, "gallery_image_reference_id").is_some()
        {
            fail(
                "Conflicting image references",
                "Only one of `image_reference_id` and `gallery_image_reference_id` can be set",
            );
        }

        if let Some(sku) = optional_string(config, "storage_account_type") {
            let sku = canonical_storage_account_type(&sku);
            let performance = ["disk_iops_read_write", "disk_mbps_read_write", "logical_sector_size"]
                .iter()
                .any(|name| optional_i64(config, name).is_some());
            if performance && !supports_performance_settings(&sku) {
                fail(
                    "Unsupported performance settings",
                    "disk_iops_read_write, disk_mbps_read_write and logical_sector_size are only available for UltraSSD disks and PremiumV2 disks",
                );
            }
            if optional_string(config, "tier").is_some() && !is_premium(&sku) {
                fail(
                    "Unsupported tier",
                    "`tier` can only be specified when `storage_account_type` is set to `Premium_LRS` or `Premium_ZRS`",
                );
            }
            if optional_bool(config, "on_demand_bursting_enabled") == Some(true) {
                if !is_premium(&sku) {
                    fail(
                        "Unsupported bursting",
                        "`on_demand_bursting_enabled` can only be set to true when `storage_account_type` is set to `Premium_LRS` or `Premium_ZRS`",
                    );
                }
                if optional_i64(config, "disk_size_gb").is_some_and(|size| size <= 512) {
                    fail(
                        "Unsupported bursting",
                        "`on_demand_bursting_enabled` can only be set to true when `disk_size_gb` is larger than 512GB",
                    );
                }
            }
        }

        if optional_string(config, "disk_access_id").is_some()
            && !pending(config, "network_access_policy")
            && optional_string(config, "network_access_policy").as_deref() != Some("AllowPrivate")
        {
            fail(
                "Unsupported disk_access_id",
                "disk_access_id is only available when network_access_policy is set to AllowPrivate",
            );
        }

        diagnostics
    }

    fn config_id(&self, config: &DynamicValue) -> Result<ManagedDiskId, Diagnostic> {
        Ok(ManagedDiskId::new(
            &self.subscription_id,
            required_string(config, "resource_group_name")?,
            required_string(config, "name")?,
        ))
    }

    pub(crate) fn expand(config: &DynamicValue) -> Result<Disk, Diagnostic> {
        let create_option = required_string(config, "create_option")?;
        let mut creation_data = CreationData {
            create_option: create_option.clone(),
            logical_sector_size: optional_i64(config, "logical_sector_size"),
            ..Default::default()
        };
        match create_option.as_str() {
            "Import" | "ImportSecure" => {
                creation_data.source_uri = optional_string(config, "source_uri");
                creation_data.storage_account_id = optional_string(config, "storage_account_id");
            }
            "Copy" | "Restore" => {
                creation_data.source_resource_id = optional_string(config, "source_resource_id");
            }
            "FromImage" => {
                let image = optional_string(config, "image_reference_id");
                let gallery = optional_string(config, "gallery_image_reference_id");
                if let Some(id) = image {
                    creation_data.image_reference = Some(SubResource { id });
                } else if let Some(id) = gallery {
                    creation_data.gallery_image_reference = Some(SubResource { id });
                }
            }
            "Upload" => {
                creation_data.upload_size_bytes = optional_i64(config, "upload_size_bytes");
            }
            _ => {}
        }

        let storage_account_type =
            canonical_storage_account_type(&required_string(config, "storage_account_type")?);
        let network_access_policy = optional_string(config, "network_access_policy")
            .unwrap_or_else(|| "AllowAll".to_string());
        let disk_access_id = if network_access_policy == "AllowPrivate" {
            optional_string(config, "disk_access_id")
        } else {
            None
        };

        Ok(Disk {
            location: required_string(config, "location")?,
            tags: tags(config),
            zones: optional_string(config, "zone").map(|zone| vec![zone]),
            sku: Some(DiskSku {
                name: storage_account_type,
            }),
            properties: Some(DiskProperties {
                creation_data,
                disk_size_gb: optional_i64(config, "disk_size_gb"),
                os_type: optional_string(config, "os_type"),
                disk_iops_read_write: optional_i64(config, "disk_iops_read_write"),
                disk_mbps_read_write: optional_i64(config, "disk_mbps_read_write"),
                tier: optional_string(config, "tier"),
                max_shares: optional_i64(config, "max_shares"),
                network_access_policy: Some(network_access_policy),
                disk_access_id,
                public_network_access: Some(EnabledState::from(
                    optional_bool(config, "public_network_access_enabled").unwrap_or(true),
                )),
                bursting_enabled: optional_bool(config, "on_demand_bursting_enabled"),
                hyper_v_generation: optional_string(config, "hyper_v_generation"),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// PATCH body holding only what changed between `prior` and `config`
    pub(crate) fn expand_update(
        prior: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DiskUpdate, Diagnostic> {
        let changed_string = |name: &str| {
            let new = optional_string(config, name);
            (new != optional_string(prior, name)).then_some(new)
        };
        let changed_i64 = |name: &str| {
            let new = optional_i64(config, name);
            (new.is_some() && new != optional_i64(prior, name)).then_some(new).flatten()
        };

        let storage_account_type =
            canonical_storage_account_type(&required_string(config, "storage_account_type")?);
        let mut update = DiskUpdate::default();
        let props = &mut update.properties;

        if let (Some(old), Some(new)) = (
            optional_i64(prior, "disk_size_gb"),
            optional_i64(config, "disk_size_gb"),
        ) {
            if new < old {
                return Err(Diagnostic::error(
                    "Invalid disk_size_gb",
                    "New size must be greater than original size. Shrinking disks is not supported on Azure",
                )
                .with_attribute(AttributePath::new("disk_size_gb")));
            }
        }
        props.disk_size_gb = changed_i64("disk_size_gb");

        let sku_changed = !optional_string(prior, "storage_account_type")
            .is_some_and(|old| old.eq_ignore_ascii_case(&storage_account_type));
        let max_shares = changed_i64("max_shares");
        if sku_changed || max_shares.is_some() {
            update.sku = Some(DiskSku {
                name: storage_account_type.clone(),
            });
        }
        props.max_shares = max_shares;

        if let Some(tier) = changed_string("tier") {
            props.tier = tier;
        }
        if let Some(os_type) = changed_string("os_type") {
            props.os_type = os_type;
        }

        let iops = changed_i64("disk_iops_read_write");
        let mbps = changed_i64("disk_mbps_read_write");
        if (iops.is_some() || mbps.is_some()) && !supports_performance_settings(&storage_account_type)
        {
            return Err(Diagnostic::error(
                "Unsupported performance settings",
                "disk_iops_read_write and disk_mbps_read_write are only available for UltraSSD disks and PremiumV2 disks",
            ));
        }
        props.disk_iops_read_write = iops;
        props.disk_mbps_read_write = mbps;

        let policy = optional_string(config, "network_access_policy")
            .unwrap_or_else(|| "AllowAll".to_string());
        if changed_string("disk_access_id").is_some() && policy == "AllowPrivate" {
            props.disk_access_id = optional_string(config, "disk_access_id");
        }
        props.network_access_policy = Some(policy);

        let public = optional_bool(config, "public_network_access_enabled").unwrap_or(true);
        if optional_bool(prior, "public_network_access_enabled") != Some(public) {
            props.public_network_access = Some(EnabledState::from(public));
        }

        let bursting = optional_bool(config, "on_demand_bursting_enabled");
        if bursting.is_some() && bursting != optional_bool(prior, "on_demand_bursting_enabled") {
            props.bursting_enabled = bursting;
        }

        let new_tags = tags(config).unwrap_or_default();
        if tags(prior).unwrap_or_default() != new_tags {
            update.tags = Some(new_tags);
        }

        Ok(update)
    }

    /// Attributes whose change ARM rejects while the owning VM is running
    pub(crate) fn offline_changes(prior: &DynamicValue, config: &DynamicValue) -> Vec<&'static str> {
        let mut changes = vec![];
        let sku_changed = match (
            optional_string(prior, "storage_account_type"),
            optional_string(config, "storage_account_type"),
        ) {
            (Some(old), Some(new)) => !old.eq_ignore_ascii_case(&new),
            _ => false,
        };
        if sku_changed {
            changes.push("storage_account_type");
        }
        if optional_string(config, "tier").is_some()
            && optional_string(config, "tier") != optional_string(prior, "tier")
        {
            changes.push("tier");
        }
        let bursting = optional_bool(config, "on_demand_bursting_enabled");
        if bursting.is_some() && bursting != optional_bool(prior, "on_demand_bursting_enabled") {
            changes.push("on_demand_bursting_enabled");
        }
        changes
    }

    pub(crate) fn grows_past_detach_boundary(prior: &DynamicValue, config: &DynamicValue) -> bool {
        match (
            optional_i64(prior, "disk_size_gb"),
            optional_i64(config, "disk_size_gb"),
        ) {
            (Some(old), Some(new)) => old < DETACH_BOUNDARY_GB && new >= DETACH_BOUNDARY_GB,
            _ => false,
        }
    }

    /// Refuses updates the current attachment makes impossible. Stopping or
    /// detaching the virtual machine is left to the configuration that owns it.
    pub(crate) fn check_attachment(
        id: &ManagedDiskId,
        disk: &Disk,
        offline: &[&str],
        crosses_boundary: bool,
    ) -> Result<(), Diagnostic> {
        if crosses_boundary {
            if let Some(vm) = disk.managed_by.as_deref() {
                return Err(Diagnostic::error(
                    "Managed disk must be detached",
                    format!(
                        "{} is attached to {}. Disks of {} GB or less must be detached before growing to {} GB or more",
                        id.describe(),
                        vm,
                        DETACH_BOUNDARY_GB - 1,
                        DETACH_BOUNDARY_GB
                    ),
                )
                .with_attribute(AttributePath::new("disk_size_gb")));
            }
        }
        match disk.running_vm() {
            Some(vm) if !offline.is_empty() => Err(Diagnostic::error(
                "Managed disk is in use",
                format!(
                    "Changing {} requires {} to be stopped and deallocated before {} can be updated",
                    offline.join(", "),
                    vm,
                    id.describe()
                ),
            )
            .with_attribute(AttributePath::new(offline[0]))),
            _ => Ok(()),
        }
    }

    async fn wait_for_provisioning(
        &self,
        ctx: &Context,
        id: &ManagedDiskId,
        timeout: std::time::Duration,
    ) -> Result<Disk, Diagnostic> {
        let client = self.client()?;
        StateWaiter::new(id.describe(), timeout)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &provisioning(), move || async move {
                Refreshed::from_lookup(client.get(id).await, Disk::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Managed disk did not finish provisioning", &e))?;

        client
            .get(id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))
    }

    async fn create_disk(&self, ctx: &Context, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        if let Some(diag) = Self::check(config).into_iter().next() {
            return Err(diag);
        }
        let id = self.config_id(config)?;
        require_absent(client.get(&id).await, TYPE_NAME, &id.id())?;

        let body = Self::expand(config)?;
        client
            .create_or_update(&id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to create {}", id.describe()), &e))?;

        let disk = self.wait_for_provisioning(ctx, &id, TIMEOUTS.create).await?;
        Ok(flatten(&id, &disk, Some(config)))
    }

    async fn update_disk(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        if let Some(diag) = Self::check(config).into_iter().next() {
            return Err(diag);
        }
        let id = parse_id(ManagedDiskId::parse, &state_id(prior, TYPE_NAME)?)?;
        let update = Self::expand_update(prior, config)?;

        let offline = Self::offline_changes(prior, config);
        let crosses_boundary = Self::grows_past_detach_boundary(prior, config);
        if !offline.is_empty() || crosses_boundary {
            let current = client
                .get(&id)
                .await
                .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
            Self::check_attachment(&id, &current, &offline, crosses_boundary)?;
        }

        client
            .update(&id, &update)
            .await
            .map_err(|e| api_error(format!("Failed to update {}", id.describe()), &e))?;

        let disk = self.wait_for_provisioning(ctx, &id, TIMEOUTS.update).await?;
        Ok(flatten(&id, &disk, Some(config)))
    }
}

/// `prior` supplies the configured spelling of location and the values ARM
/// does not echo back
pub(crate) fn flatten(id: &ManagedDiskId, disk: &Disk, prior: Option<&DynamicValue>) -> DynamicValue {
    let props = disk.properties.clone().unwrap_or_default();
    let creation = &props.creation_data;
    let prior_string = |name: &str| prior.and_then(|p| optional_string(p, name));

    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(
        &mut state,
        "location",
        Some(location_for_state(prior_string("location"), &disk.location)),
    );
    put_string(
        &mut state,
        "storage_account_type",
        disk.sku.as_ref().map(|sku| sku.name.clone()),
    );
    put_string(&mut state, "create_option", Some(creation.create_option.clone()));
    put_i64(&mut state, "logical_sector_size", creation.logical_sector_size);
    put_string(&mut state, "source_uri", creation.source_uri.clone());
    put_string(&mut state, "source_resource_id", creation.source_resource_id.clone());
    put_string(&mut state, "storage_account_id", creation.storage_account_id.clone());
    put_string(
        &mut state,
        "image_reference_id",
        creation.image_reference.as_ref().map(|r| r.id.clone()),
    );
    put_string(
        &mut state,
        "gallery_image_reference_id",
        creation.gallery_image_reference.as_ref().map(|r| r.id.clone()),
    );
    // the service reports the uploaded size only while the upload is pending
    put_i64(
        &mut state,
        "upload_size_bytes",
        creation
            .upload_size_bytes
            .or_else(|| prior.and_then(|p| optional_i64(p, "upload_size_bytes"))),
    );
    put_string(&mut state, "os_type", props.os_type.clone());
    put_i64(&mut state, "disk_size_gb", props.disk_size_gb);
    put_i64(&mut state, "disk_iops_read_write", props.disk_iops_read_write);
    put_i64(&mut state, "disk_mbps_read_write", props.disk_mbps_read_write);
    put_string(&mut state, "network_access_policy", props.network_access_policy.clone());
    put_string(&mut state, "disk_access_id", props.disk_access_id.clone());
    put_bool(
        &mut state,
        "public_network_access_enabled",
        Some(props.public_network_access.map(bool::from).unwrap_or(true)),
    );
    put_string(&mut state, "tier", props.tier.clone());
    put_i64(&mut state, "max_shares", props.max_shares);
    put_string(&mut state, "hyper_v_generation", props.hyper_v_generation.clone());
    put_bool(&mut state, "on_demand_bursting_enabled", props.bursting_enabled);
    put_string(
        &mut state,
        "zone",
        disk.zones.as_ref().and_then(|zones| zones.first().cloned()),
    );
    put_tags(&mut state, disk.tags.as_ref());
    state
}

#[async_trait]
impl Resource for ManagedDiskResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = Self::schema_definition().validate_config(&request.config);
        diagnostics.extend(Self::check(&request.config));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_disk(&ctx, &request.config).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse::failed(diag),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };
        let id = match state_id(&request.current_state, TYPE_NAME)
            .and_then(|raw| parse_id(ManagedDiskId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(disk) => {
                ReadResourceResponse::found(flatten(&id, &disk, Some(&request.current_state)))
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} was not found - removing from state", id.describe());
                ReadResourceResponse::removed()
            }
            Err(e) => ReadResourceResponse::failed(
                request.current_state,
                api_error(format!("Failed to read {}", id.describe()), &e),
            ),
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self
            .update_disk(&ctx, &request.prior_state, &request.config)
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
                new_identity: None,
            },
            Err(diag) => UpdateResourceResponse::failed(request.prior_state, diag),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = match (
            self.client(),
            state_id(&request.prior_state, TYPE_NAME)
                .and_then(|raw| parse_id(ManagedDiskId::parse, &raw)),
        ) {
            (Ok(client), Ok(id)) => match client.delete(&id).await {
                Ok(()) => {
                    let id = &id;
                    wait_for_deletion(&ctx, id.describe(), TIMEOUTS.delete, || client.get(id)).await
                }
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(api_error(format!("Failed to delete {}", id.describe()), &e)),
            },
            (Err(diag), _) | (_, Err(diag)) => Err(diag),
        };
        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ManagedDiskResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.compute.disks.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ManagedDiskResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_validating_id(
            &ctx,
            AttributePath::new("id"),
            &request,
            &mut response,
            ManagedDiskId::parse,
        );
        response
    }
}

#[cfg(test)]
#[path = "./resource_managed_disk_test.rs"]
mod resource_managed_disk_test;
