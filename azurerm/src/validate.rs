//! Attribute validators shared by the Azure resources

use tfplug::schema::Validator;
use tfplug::validator::{IntInSlice, StringFunc, StringInSlice};

use crate::ids::{validate_resource_id, KeyVaultKeyId, ResourceId};

/// Daily ingestion commitment tiers, in GB, accepted by workspaces and
/// clusters alike
pub const CAPACITY_RESERVATION_LEVELS: [i64; 11] =
    [100, 200, 300, 400, 500, 1000, 2000, 5000, 10000, 25000, 50000];

pub const WORKSPACE_SKUS: [&str; 9] = [
    "Free",
    "PerNode",
    "Premium",
    "Standard",
    "Standalone",
    "Unlimited",
    "CapacityReservation",
    "PerGB2018",
    "LACluster",
];

fn alphanumeric_hyphen_name(value: &str, kind: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(format!("{} must be between {} and {} characters, got {}", kind, min, max, len));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("{} may only contain alphanumeric characters and hyphens", kind));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(format!("{} cannot begin or end with a hyphen", kind));
    }
    Ok(())
}

pub fn check_workspace_name(value: &str) -> Result<(), String> {
    alphanumeric_hyphen_name(value, "workspace name", 4, 63)
}

pub fn check_cluster_name(value: &str) -> Result<(), String> {
    alphanumeric_hyphen_name(value, "cluster name", 4, 63)
}

pub fn check_storage_insights_name(value: &str) -> Result<(), String> {
    alphanumeric_hyphen_name(value, "storage insights name", 4, 63)
}

/// Must also start with a letter
pub fn check_data_export_name(value: &str) -> Result<(), String> {
    alphanumeric_hyphen_name(value, "data export rule name", 4, 63)?;
    match value.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => Ok(()),
        _ => Err("data export rule name must start with a letter".to_string()),
    }
}

pub fn check_resource_group_name(value: &str) -> Result<(), String> {
    if value.is_empty() || value.chars().count() > 90 {
        return Err("resource group name must be between 1 and 90 characters".to_string());
    }
    if value.ends_with('.') {
        return Err("resource group name cannot end with a period".to_string());
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')');
    if !value.chars().all(allowed) {
        return Err(
            "resource group name may only contain alphanumerics, underscores, hyphens, periods and parentheses"
                .to_string(),
        );
    }
    Ok(())
}

/// Retention is 30 to 730 days, or exactly 7 on the Free SKU
pub fn check_retention(days: i64, sku: Option<&str>) -> Result<(), String> {
    let free = sku.is_some_and(|s| s.eq_ignore_ascii_case("Free"));
    match (free, days) {
        (true, 7) => Ok(()),
        (true, _) => Err(format!(
            "retention_in_days must be 7 when sku is Free, got {}",
            days
        )),
        (false, 30..=730) => Ok(()),
        (false, _) => Err(format!(
            "retention_in_days must be between 30 and 730, got {}",
            days
        )),
    }
}

pub fn workspace_name() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid workspace name", check_workspace_name))
}

pub fn cluster_name() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid cluster name", check_cluster_name))
}

pub fn data_export_name() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid data export rule name", check_data_export_name))
}

pub fn storage_insights_name() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid storage insights name", check_storage_insights_name))
}

pub fn resource_group_name() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid resource group name", check_resource_group_name))
}

pub fn workspace_sku() -> Box<dyn Validator> {
    Box::new(StringInSlice::new(&WORKSPACE_SKUS).ignore_case())
}

pub fn capacity_reservation_level() -> Box<dyn Validator> {
    Box::new(IntInSlice::new(&CAPACITY_RESERVATION_LEVELS))
}

/// Any string the typed ID parser accepts
pub fn resource_id<T: ResourceId + 'static>() -> Box<dyn Validator> {
    Box::new(StringFunc::new(
        format!("valid {} ID", T::TEMPLATE.description),
        |value: &str| T::parse(value).map(|_| ()).map_err(|e| e.to_string()),
    ))
}

/// Any well-formed ARM ID, for attributes that accept several resource types
pub fn arm_resource_id() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid Azure resource ID", validate_resource_id))
}

pub fn key_vault_key_id() -> Box<dyn Validator> {
    Box::new(StringFunc::new("valid Key Vault key ID", |value: &str| {
        KeyVaultKeyId::parse(value).map(|_| ()).map_err(|e| e.to_string())
    }))
}
