//! Log Analytics workspace resource

use std::time::Duration;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_validating_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use super::provisioning;
use crate::api::common::{EnabledState, Tags};
use crate::api::loganalytics::workspaces::{
    SharedKeys, Workspace, WorkspaceCapping, WorkspaceFeatures, WorkspaceProperties, WorkspaceSku,
};
use crate::api::loganalytics::WorkspacesClient;
use crate::ids::{LogAnalyticsWorkspaceId, ResourceId};
use crate::poll::{Refreshed, StateWaiter, UntilDeleted};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, location_attribute, location_for_state, name_attribute,
    not_configured, optional_bool, optional_f64, optional_i64, optional_string, parse_id, put_bool,
    put_f64, put_i64, put_string, put_tags, read_within, require_absent, required_string,
    resource_group_name_attribute, state_id, tags, tags_attribute, wait_error, Timeouts,
    POLL_INTERVAL,
};
use crate::validate::{self, check_retention, WORKSPACE_SKUS};

const TYPE_NAME: &str = "azurerm_log_analytics_workspace";
const DEFAULT_SKU: &str = "PerGB2018";
const CAPACITY_RESERVATION: &str = "CapacityReservation";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

#[derive(Default)]
pub struct WorkspaceResource {
    client: Option<WorkspacesClient>,
    subscription_id: String,
}

impl WorkspaceResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(subscription_id: impl Into<String>, client: WorkspacesClient) -> Self {
        Self {
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn client(&self) -> Result<&WorkspacesClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Log Analytics (formerly Operational Insights) Workspace")
            .attribute(id_attribute())
            .attribute(name_attribute(
                "Name of the workspace, unique within the resource group",
                validate::workspace_name(),
            ))
            .attribute(resource_group_name_attribute())
            .attribute(location_attribute())
            .attribute(
                AttributeBuilder::new("sku", AttributeType::String)
                    .description("Pricing tier; defaults to PerGB2018")
                    .optional()
                    .computed()
                    .validator(validate::workspace_sku())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("retention_in_days", AttributeType::Number)
                    .description("Data retention in days: 7 on the Free tier, otherwise 30 to 730")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("daily_quota_gb", AttributeType::Number)
                    .description("Daily ingestion cap in GB; -1 means unlimited")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("internet_ingestion_enabled", AttributeType::Bool)
                    .description("Allow ingestion over the public internet")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("internet_query_enabled", AttributeType::Bool)
                    .description("Allow queries over the public internet")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("reservation_capacity_in_gb_per_day", AttributeType::Number)
                    .description("Capacity reservation level, CapacityReservation SKU only")
                    .optional()
                    .validator(validate::capacity_reservation_level())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("local_authentication_disabled", AttributeType::Bool)
                    .description("Require Azure AD authentication for ingestion")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("workspace_id", AttributeType::String)
                    .description("The workspace (customer) ID")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("primary_shared_key", AttributeType::String)
                    .computed()
                    .sensitive()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secondary_shared_key", AttributeType::String)
                    .computed()
                    .sensitive()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(tags_attribute())
            .build()
    }

    fn extract_config(&self, config: &DynamicValue) -> Result<WorkspaceConfig, Diagnostic> {
        let name = required_string(config, "name")?;
        let resource_group = required_string(config, "resource_group_name")?;
        Ok(WorkspaceConfig {
            id: LogAnalyticsWorkspaceId::new(&self.subscription_id, resource_group, name),
            location: required_string(config, "location")?,
            sku: optional_string(config, "sku").unwrap_or_else(|| DEFAULT_SKU.to_string()),
            retention_in_days: optional_i64(config, "retention_in_days"),
            daily_quota_gb: optional_f64(config, "daily_quota_gb"),
            internet_ingestion_enabled: optional_bool(config, "internet_ingestion_enabled")
                .unwrap_or(true),
            internet_query_enabled: optional_bool(config, "internet_query_enabled")
                .unwrap_or(true),
            reservation_capacity_in_gb_per_day: optional_i64(
                config,
                "reservation_capacity_in_gb_per_day",
            ),
            local_authentication_disabled: optional_bool(config, "local_authentication_disabled")
                .unwrap_or(false),
            tags: tags(config),
        })
    }

    async fn apply(
        &self,
        ctx: &Context,
        cfg: &WorkspaceConfig,
        config: &DynamicValue,
        timeout: Duration,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let id = &cfg.id;

        client
            .create_or_update(id, &cfg.expand())
            .await
            .map_err(|e| api_error(format!("Failed to create or update {}", id.describe()), &e))?;

        StateWaiter::new(id.describe(), timeout)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &provisioning(), move || async move {
                Refreshed::from_lookup(client.get(id).await, Workspace::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Workspace did not finish provisioning", &e))?;

        let workspace = client
            .get(id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        let keys = self.shared_keys(id).await;
        Ok(flatten(id, &workspace, keys.as_ref(), Some(config)))
    }

    /// Missing keys are logged rather than failing the read
    async fn shared_keys(&self, id: &LogAnalyticsWorkspaceId) -> Option<SharedKeys> {
        let client = self.client.as_ref()?;
        match client.shared_keys(id).await {
            Ok(keys) => Some(keys),
            Err(e) => {
                tracing::warn!("Unable to list shared keys for {}: {}", id.describe(), e);
                None
            }
        }
    }
}

impl WorkspaceResource {
    async fn destroy(&self, ctx: &Context, prior_state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = self.client()?;
        let raw = state_id(prior_state, TYPE_NAME)?;
        let id = &parse_id(LogAnalyticsWorkspaceId::parse, &raw)?;

        tracing::info!("Deleting {}", id.describe());
        match client.delete(id, false).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(api_error(format!("Failed to delete {}", id.describe()), &e)),
        }

        StateWaiter::new(id.describe(), TIMEOUTS.delete)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &UntilDeleted, move || async move {
                Refreshed::from_lookup(client.get(id).await, Workspace::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Workspace was not deleted", &e))?;
        Ok(())
    }
}

struct WorkspaceConfig {
    id: LogAnalyticsWorkspaceId,
    location: String,
    sku: String,
    retention_in_days: Option<i64>,
    daily_quota_gb: Option<f64>,
    internet_ingestion_enabled: bool,
    internet_query_enabled: bool,
    reservation_capacity_in_gb_per_day: Option<i64>,
    local_authentication_disabled: bool,
    tags: Option<Tags>,
}

impl WorkspaceConfig {
    fn expand(&self) -> Workspace {
        let capacity_reservation_level = if self.sku.eq_ignore_ascii_case(CAPACITY_RESERVATION) {
            self.reservation_capacity_in_gb_per_day
        } else {
            None
        };

        Workspace {
            location: self.location.clone(),
            tags: self.tags.clone(),
            properties: Some(WorkspaceProperties {
                sku: Some(WorkspaceSku {
                    name: self.sku.clone(),
                    capacity_reservation_level,
                }),
                retention_in_days: self.retention_in_days,
                workspace_capping: Some(WorkspaceCapping {
                    daily_quota_gb: self.daily_quota_gb.unwrap_or(-1.0),
                }),
                public_network_access_for_ingestion: Some(self.internet_ingestion_enabled.into()),
                public_network_access_for_query: Some(self.internet_query_enabled.into()),
                features: Some(WorkspaceFeatures {
                    disable_local_auth: Some(self.local_authentication_disabled),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// ARM lower-cases some SKU names; report the documented spelling
fn canonical_sku(sku: &str) -> String {
    WORKSPACE_SKUS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(sku))
        .map(|known| known.to_string())
        .unwrap_or_else(|| sku.to_string())
}

pub(crate) fn flatten(
    id: &LogAnalyticsWorkspaceId,
    workspace: &Workspace,
    keys: Option<&SharedKeys>,
    prior: Option<&DynamicValue>,
) -> DynamicValue {
    let mut state = DynamicValue::object();
    let prior_location = prior.and_then(|p| optional_string(p, "location"));
    let props = workspace.properties.clone().unwrap_or_default();
    let sku = props.sku.as_ref();

    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(
        &mut state,
        "location",
        Some(location_for_state(prior_location, &workspace.location)),
    );
    put_string(&mut state, "sku", sku.map(|s| canonical_sku(&s.name)));
    put_i64(
        &mut state,
        "reservation_capacity_in_gb_per_day",
        sku.and_then(|s| s.capacity_reservation_level),
    );
    put_i64(&mut state, "retention_in_days", props.retention_in_days);
    put_f64(
        &mut state,
        "daily_quota_gb",
        Some(
            props
                .workspace_capping
                .as_ref()
                .map(|c| c.daily_quota_gb)
                .unwrap_or(-1.0),
        ),
    );
    put_bool(
        &mut state,
        "internet_ingestion_enabled",
        Some(props.public_network_access_for_ingestion != Some(EnabledState::Disabled)),
    );
    put_bool(
        &mut state,
        "internet_query_enabled",
        Some(props.public_network_access_for_query != Some(EnabledState::Disabled)),
    );
    put_bool(
        &mut state,
        "local_authentication_disabled",
        Some(
            props
                .features
                .as_ref()
                .and_then(|f| f.disable_local_auth)
                .unwrap_or(false),
        ),
    );
    put_string(&mut state, "workspace_id", props.customer_id.clone());
    put_string(
        &mut state,
        "primary_shared_key",
        keys.and_then(|k| k.primary_shared_key.clone()),
    );
    put_string(
        &mut state,
        "secondary_shared_key",
        keys.and_then(|k| k.secondary_shared_key.clone()),
    );
    put_tags(&mut state, workspace.tags.as_ref());
    state
}

/// Cross-attribute rules the schema validators cannot express
fn validate_combination(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    let sku = optional_string(config, "sku");
    let is_capacity_reservation = sku
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case(CAPACITY_RESERVATION));
    let is_free = sku.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("Free"));

    if let Some(days) = optional_i64(config, "retention_in_days") {
        if let Err(e) = check_retention(days, sku.as_deref()) {
            diagnostics.push(
                Diagnostic::error("Invalid retention_in_days", e)
                    .with_attribute(AttributePath::new("retention_in_days")),
            );
        }
    }

    let reservation = optional_i64(config, "reservation_capacity_in_gb_per_day");
    if reservation.is_some() && !is_capacity_reservation {
        diagnostics.push(
            Diagnostic::error(
                "Invalid reservation_capacity_in_gb_per_day",
                "`reservation_capacity_in_gb_per_day` can only be used with the `CapacityReservation` SKU",
            )
            .with_attribute(AttributePath::new("reservation_capacity_in_gb_per_day")),
        );
    }
    if is_capacity_reservation
        && reservation.is_none()
        && !config
            .get_value(&AttributePath::new("reservation_capacity_in_gb_per_day"))
            .is_some_and(|v| v.is_unknown())
    {
        diagnostics.push(Diagnostic::error(
            "Missing reservation_capacity_in_gb_per_day",
            "`reservation_capacity_in_gb_per_day` must be set when using the `CapacityReservation` SKU",
        ));
    }

    if let Some(quota) = optional_f64(config, "daily_quota_gb") {
        if quota < -1.0 {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid daily_quota_gb",
                    format!("daily_quota_gb must be -1 or greater, got {}", quota),
                )
                .with_attribute(AttributePath::new("daily_quota_gb")),
            );
        } else if is_free && quota != -1.0 {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid daily_quota_gb",
                    "`Free` tier SKU quota is not configurable and is hard set to 0.5GB",
                )
                .with_attribute(AttributePath::new("daily_quota_gb")),
            );
        }
    }

    diagnostics
}

#[async_trait]
impl Resource for WorkspaceResource {
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
        diagnostics.extend(validate_combination(&request.config));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };
        let cfg = match self.extract_config(&request.config) {
            Ok(cfg) => cfg,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };

        tracing::info!("Creating {}", cfg.id.describe());
        if let Err(diag) = require_absent(client.get(&cfg.id).await, TYPE_NAME, &cfg.id.id()) {
            return CreateResourceResponse::failed(diag);
        }

        match self.apply(&ctx, &cfg, &request.config, TIMEOUTS.create).await {
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
            .and_then(|raw| parse_id(LogAnalyticsWorkspaceId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(workspace) => {
                let keys = self.shared_keys(&id).await;
                ReadResourceResponse::found(flatten(
                    &id,
                    &workspace,
                    keys.as_ref(),
                    Some(&request.current_state),
                ))
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
        let cfg = match self.extract_config(&request.config) {
            Ok(cfg) => cfg,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };

        tracing::info!("Updating {}", cfg.id.describe());
        match self.apply(&ctx, &cfg, &request.config, TIMEOUTS.update).await {
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
        DeleteResourceResponse {
            diagnostics: self
                .destroy(&ctx, &request.prior_state)
                .await
                .err()
                .into_iter()
                .collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for WorkspaceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.log_analytics.workspaces.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for WorkspaceResource {
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
            LogAnalyticsWorkspaceId::parse,
        );
        response
    }
}

#[cfg(test)]
#[path = "./resource_workspace_test.rs"]
mod resource_workspace_test;
