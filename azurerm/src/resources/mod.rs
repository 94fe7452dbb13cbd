//! Managed resources and the helpers they share
//!
//! Every resource follows the same sequence inside one operation: validate
//! the configuration, write through its typed client, poll until ARM settles,
//! read the object back and populate state.

pub mod compute;
pub mod loganalytics;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{ProviderResource, ResourceFactory};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::common::Tags;
use crate::api::ApiError;
use crate::poll::{Refreshed, StateWaiter, UntilDeleted, WaitError};
use crate::validate;

use compute::ManagedDiskResource;
use loganalytics::{
    ClusterCustomerManagedKeyResource, ClusterResource, DataExportResource, DataSourceResource,
    LinkedServiceResource, LinkedStorageAccountResource, SavedSearchResource,
    StorageInsightsResource, WorkspaceResource, WINDOWS_EVENT, WINDOWS_PERFORMANCE_COUNTER,
};

pub type Constructor = fn() -> Box<dyn ProviderResource>;

/// Every managed resource the provider serves, keyed by Terraform type name
pub const RESOURCES: &[(&str, Constructor)] = &[
    ("azurerm_log_analytics_workspace", || {
        Box::new(WorkspaceResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_cluster", || {
        Box::new(ClusterResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_cluster_customer_managed_key", || {
        Box::new(ClusterCustomerManagedKeyResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_data_export_rule", || {
        Box::new(DataExportResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_storage_insights", || {
        Box::new(StorageInsightsResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_linked_storage_account", || {
        Box::new(LinkedStorageAccountResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_linked_service", || {
        Box::new(LinkedServiceResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_saved_search", || {
        Box::new(SavedSearchResource::new()) as Box<dyn ProviderResource>
    }),
    ("azurerm_log_analytics_datasource_windows_event", || {
        Box::new(DataSourceResource::new(&WINDOWS_EVENT)) as Box<dyn ProviderResource>
    }),
    (
        "azurerm_log_analytics_datasource_windows_performance_counter",
        || Box::new(DataSourceResource::new(&WINDOWS_PERFORMANCE_COUNTER)) as Box<dyn ProviderResource>,
    ),
    ("azurerm_managed_disk", || {
        Box::new(ManagedDiskResource::new()) as Box<dyn ProviderResource>
    }),
];

pub fn factories() -> HashMap<String, ResourceFactory> {
    RESOURCES
        .iter()
        .map(|(name, constructor)| {
            let constructor = *constructor;
            (
                name.to_string(),
                Box::new(constructor) as ResourceFactory,
            )
        })
        .collect()
}

/// Default per-operation time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(30, 5, 30, 30)
    }
}

/// How often pollers re-read a resource
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Returned when a create finds the object already present
pub(crate) fn import_as_exists(type_name: &str, id: &str) -> Diagnostic {
    Diagnostic::error(
        "Resource already exists",
        format!(
            "A resource with the ID {:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {:?} for more information.",
            id, type_name
        ),
    )
}

pub(crate) fn api_error(summary: impl Into<String>, error: &ApiError) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", error))
}

pub(crate) fn wait_error(summary: impl Into<String>, error: &WaitError) -> Diagnostic {
    Diagnostic::error(summary, error.to_string())
}

/// Fails unless the pre-create lookup came back 404
pub(crate) fn require_absent<T>(
    lookup: Result<T, ApiError>,
    type_name: &str,
    id: &str,
) -> Result<(), Diagnostic> {
    match lookup {
        Ok(_) => Err(import_as_exists(type_name, id)),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(
            format!("Failed to check for an existing {}", type_name),
            &e,
        )),
    }
}

/// Re-reads after a DELETE until ARM answers 404
pub(crate) async fn wait_for_deletion<T, F, Fut>(
    ctx: &tfplug::Context,
    description: String,
    timeout: Duration,
    mut lookup: F,
) -> Result<(), Diagnostic>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    StateWaiter::new(description, timeout)
        .min_interval(POLL_INTERVAL)
        .wait(ctx, &UntilDeleted, move || {
            let lookup = lookup();
            async move { Refreshed::from_lookup(lookup.await, |_| Some("Exists")) }
        })
        .await
        .map(|_| ())
        .map_err(|e| wait_error("Resource was not deleted", &e))
}

/// Bounds a single lookup by the operation's read timeout. Cancelling the
/// request context ends the lookup early with the same error.
pub(crate) async fn read_within<T>(
    ctx: &tfplug::Context,
    timeout: Duration,
    lookup: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    let timed_out = || ApiError::Timeout(timeout.as_secs());
    tokio::select! {
        result = tokio::time::timeout(timeout, lookup) => {
            result.unwrap_or_else(|_| Err(timed_out()))
        }
        _ = ctx.cancelled() => Err(timed_out()),
    }
}

/// ID stored in state, or an error diagnostic naming the resource type
pub(crate) fn state_id(state: &DynamicValue, type_name: &str) -> Result<String, Diagnostic> {
    state
        .get_string(&AttributePath::new("id"))
        .map_err(|_| Diagnostic::error("Missing ID", format!("{} state has no ID", type_name)))
}

pub(crate) fn parse_id<T, E>(
    parse: impl FnOnce(&str) -> Result<T, E>,
    raw: &str,
) -> Result<T, Diagnostic>
where
    E: std::fmt::Display,
{
    parse(raw).map_err(|e| Diagnostic::error("Invalid resource ID", e.to_string()))
}

pub(crate) fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Keeps the configured spelling when it names the same region as ARM
pub(crate) fn location_for_state(prior: Option<String>, remote: &str) -> String {
    match prior {
        Some(prior) if normalize_location(&prior) == normalize_location(remote) => prior,
        _ => remote.to_string(),
    }
}

// Config accessors. Unset and null attributes read as `None`.

pub(crate) fn required_string(config: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    config
        .get_string(&AttributePath::new(name))
        .map_err(|_| {
            Diagnostic::error(
                format!("Missing {}", name),
                format!("The {} attribute is required", name),
            )
            .with_attribute(AttributePath::new(name))
        })
}

pub(crate) fn optional_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

pub(crate) fn optional_i64(config: &DynamicValue, name: &str) -> Option<i64> {
    config.get_i64(&AttributePath::new(name)).ok()
}

pub(crate) fn optional_f64(config: &DynamicValue, name: &str) -> Option<f64> {
    config.get_number(&AttributePath::new(name)).ok()
}

pub(crate) fn optional_bool(config: &DynamicValue, name: &str) -> Option<bool> {
    config.get_bool(&AttributePath::new(name)).ok()
}

pub(crate) fn string_list(config: &DynamicValue, name: &str) -> Vec<String> {
    config
        .get_string_list(&AttributePath::new(name))
        .unwrap_or_default()
}

pub(crate) fn tags(config: &DynamicValue) -> Option<Tags> {
    config.get_string_map(&AttributePath::new("tags")).ok()
}

// State writers. `None` is written as null so every attribute is present.

pub(crate) fn put_string(state: &mut DynamicValue, name: &str, value: Option<String>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(v) => state.set_string(&path, v),
        None => state.set_null(&path),
    };
}

pub(crate) fn put_i64(state: &mut DynamicValue, name: &str, value: Option<i64>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(v) => state.set_i64(&path, v),
        None => state.set_null(&path),
    };
}

pub(crate) fn put_f64(state: &mut DynamicValue, name: &str, value: Option<f64>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(v) => state.set_number(&path, v),
        None => state.set_null(&path),
    };
}

pub(crate) fn put_bool(state: &mut DynamicValue, name: &str, value: Option<bool>) {
    let path = AttributePath::new(name);
    let _ = match value {
        Some(v) => state.set_bool(&path, v),
        None => state.set_null(&path),
    };
}

pub(crate) fn put_string_list(state: &mut DynamicValue, name: &str, values: Vec<String>) {
    let _ = state.set_string_list(&AttributePath::new(name), values);
}

/// Empty tag maps are written as null to match an omitted `tags` block
pub(crate) fn put_tags(state: &mut DynamicValue, tags: Option<&Tags>) {
    let path = AttributePath::new("tags");
    let _ = match tags.filter(|t| !t.is_empty()) {
        Some(t) => state.set_map(
            &path,
            t.iter()
                .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                .collect(),
        ),
        None => state.set_null(&path),
    };
}

// Attributes shared by most resources.

pub(crate) fn id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The Azure Resource Manager ID")
        .computed()
        .plan_modifier(Box::new(UseStateForUnknown))
        .build()
}

pub(crate) fn name_attribute(
    description: &str,
    validator: Box<dyn tfplug::schema::Validator>,
) -> Attribute {
    AttributeBuilder::new("name", AttributeType::String)
        .description(description)
        .required()
        .validator(validator)
        .plan_modifier(Box::new(RequiresReplace))
        .build()
}

pub(crate) fn resource_group_name_attribute() -> Attribute {
    AttributeBuilder::new("resource_group_name", AttributeType::String)
        .description("The resource group the resource lives in")
        .required()
        .validator(validate::resource_group_name())
        .plan_modifier(Box::new(RequiresReplace))
        .build()
}

pub(crate) fn location_attribute() -> Attribute {
    AttributeBuilder::new("location", AttributeType::String)
        .description("The Azure region")
        .required()
        .validator(Box::new(tfplug::validator::StringNotEmpty))
        .plan_modifier(Box::new(LocationRequiresReplace))
        .build()
}

pub(crate) fn tags_attribute() -> Attribute {
    AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
        .description("Tags to assign to the resource")
        .optional()
        .build()
}

/// Replaces the resource when the region changes. "West Europe" and
/// "westeurope" name the same region.
pub(crate) struct LocationRequiresReplace;

impl tfplug::schema::PlanModifier for LocationRequiresReplace {
    fn description(&self) -> String {
        "Requires replacement when the normalized location changes".to_string()
    }

    fn modify(
        &self,
        request: tfplug::schema::PlanModifierRequest,
    ) -> tfplug::schema::PlanModifierResponse {
        let changed = match (
            request.state_value.value.as_str(),
            request.plan_value.value.as_str(),
        ) {
            (Some(state), Some(plan)) => normalize_location(state) != normalize_location(plan),
            _ => false,
        };
        tfplug::schema::PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace: changed,
            diagnostics: vec![],
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::schema::{PlanModifier, PlanModifierRequest};

    #[test]
    fn registry_names_are_unique() {
        let all = factories();
        assert_eq!(all.len(), RESOURCES.len());
        for (name, factory) in &all {
            assert_eq!(factory().type_name(), name.as_str());
        }
    }

    #[test]
    fn import_as_exists_names_id_and_type() {
        let diag = import_as_exists("azurerm_managed_disk", "/subscriptions/x");
        assert_eq!(diag.summary, "Resource already exists");
        assert!(diag.detail.contains("\"/subscriptions/x\""));
        assert!(diag.detail.contains("imported into the State"));
        assert!(diag.detail.contains("\"azurerm_managed_disk\""));
    }

    #[test]
    fn require_absent_distinguishes_lookups() {
        let not_found: Result<(), ApiError> = Err(ApiError::NotFound {
            path: "/x".to_string(),
        });
        assert!(require_absent(not_found, "t", "/x").is_ok());

        let diag = require_absent(Ok(()), "t", "/x").unwrap_err();
        assert_eq!(diag.summary, "Resource already exists");

        let diag = require_absent::<()>(Err(ApiError::RateLimited), "t", "/x").unwrap_err();
        assert!(diag.summary.contains("existing t"));
    }

    #[test]
    fn locations_compare_normalized() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(
            location_for_state(Some("West Europe".to_string()), "westeurope"),
            "West Europe"
        );
        assert_eq!(
            location_for_state(Some("West Europe".to_string()), "northeurope"),
            "northeurope"
        );
        assert_eq!(location_for_state(None, "westeurope"), "westeurope");
    }

    #[test]
    fn location_modifier_ignores_spelling() {
        let request = |state: &str, plan: &str| PlanModifierRequest {
            config_value: DynamicValue::new(Dynamic::String(plan.to_string())),
            state_value: DynamicValue::new(Dynamic::String(state.to_string())),
            plan_value: DynamicValue::new(Dynamic::String(plan.to_string())),
            path: AttributePath::new("location"),
        };
        let same = LocationRequiresReplace.modify(request("westeurope", "West Europe"));
        assert!(!same.requires_replace);
        let moved = LocationRequiresReplace.modify(request("westeurope", "North Europe"));
        assert!(moved.requires_replace);
    }

    #[test]
    fn state_writers_null_missing_values() {
        let mut state = DynamicValue::object();
        put_string(&mut state, "a", None);
        put_i64(&mut state, "b", Some(3));
        put_tags(&mut state, Some(&Tags::new()));

        assert!(state.get_value(&AttributePath::new("a")).unwrap().is_null());
        assert_eq!(state.get_i64(&AttributePath::new("b")).unwrap(), 3);
        assert!(state.get_value(&AttributePath::new("tags")).unwrap().is_null());
    }

    #[test]
    fn config_readers_treat_empty_as_unset() {
        let config = test_support::json(serde_json::json!({
            "name": "ws1",
            "sku": "",
            "tags": {"env": "test"},
            "tables": ["Heartbeat"]
        }));
        assert_eq!(required_string(&config, "name").unwrap(), "ws1");
        assert!(required_string(&config, "missing").is_err());
        assert_eq!(optional_string(&config, "sku"), None);
        assert_eq!(tags(&config).unwrap()["env"], "test");
        assert_eq!(string_list(&config, "tables"), vec!["Heartbeat"]);
        assert!(string_list(&config, "missing").is_empty());
    }

    #[tokio::test]
    async fn read_within_bounds_slow_lookups() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, ApiError>(1)
        };
        let err = read_within(&tfplug::Context::new(), Duration::from_millis(50), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));

        let ready = read_within(&tfplug::Context::new(), Duration::from_secs(1), async {
            Ok::<_, ApiError>(7)
        })
        .await
        .unwrap();
        assert_eq!(ready, 7);
    }

    #[tokio::test]
    async fn read_within_stops_on_cancellation() {
        let ctx = tfplug::Context::new();
        ctx.cancel();
        let started = std::time::Instant::now();
        let err = read_within(&ctx, Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, ApiError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Timeout(30)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
