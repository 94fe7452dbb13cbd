//! Dedicated Log Analytics cluster resource
//!
//! Clusters take a long time to provision, so create and update wait on the
//! provisioning state with generous timeouts.

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
use tfplug::schema::{nested_block, AttributeBuilder, AttributeType, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringInSlice;

use super::provisioning;
use crate::api::common::Tags;
use crate::api::loganalytics::clusters::{Cluster, ClusterPatch, ClusterSku, Identity};
use crate::api::loganalytics::ClustersClient;
use crate::ids::{LogAnalyticsClusterId, ResourceId};
use crate::poll::{Refreshed, StateWaiter, UntilDeleted};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, location_attribute, location_for_state, name_attribute,
    not_configured, optional_i64, optional_string, parse_id, put_i64, put_string, put_tags,
    read_within, require_absent, required_string, resource_group_name_attribute, state_id, tags,
    tags_attribute, wait_error, Timeouts, POLL_INTERVAL,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_log_analytics_cluster";
const DEFAULT_SIZE_GB: i64 = 1000;
const SYSTEM_ASSIGNED: &str = "SystemAssigned";
const TIMEOUTS: Timeouts = Timeouts::minutes(360, 5, 360, 30);

#[derive(Default)]
pub struct ClusterResource {
    client: Option<ClustersClient>,
    subscription_id: String,
}

impl ClusterResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(subscription_id: impl Into<String>, client: ClustersClient) -> Self {
        Self {
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn client(&self) -> Result<&ClustersClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a dedicated Log Analytics cluster")
            .attribute(id_attribute())
            .attribute(name_attribute("Name of the cluster", validate::cluster_name()))
            .attribute(resource_group_name_attribute())
            .attribute(location_attribute())
            .attribute(
                AttributeBuilder::new("size_gb", AttributeType::Number)
                    .description("Capacity reservation of the cluster in GB per day")
                    .optional()
                    .computed()
                    .validator(validate::capacity_reservation_level())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_id", AttributeType::String)
                    .description("The GUID of the cluster")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(tags_attribute())
            .block(nested_block(
                "identity",
                NestingMode::List,
                1,
                1,
                vec![
                    AttributeBuilder::new("type", AttributeType::String)
                        .description("Only SystemAssigned is supported")
                        .required()
                        .validator(Box::new(StringInSlice::new(&[SYSTEM_ASSIGNED])))
                        .plan_modifier(Box::new(RequiresReplace))
                        .build(),
                    AttributeBuilder::new("principal_id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("tenant_id", AttributeType::String)
                        .computed()
                        .build(),
                ],
            ))
            .build()
    }

    fn extract_config(&self, config: &DynamicValue) -> Result<ClusterConfig, Diagnostic> {
        let name = required_string(config, "name")?;
        let resource_group = required_string(config, "resource_group_name")?;
        let identity_type = config
            .get_string(&AttributePath::new("identity").index(0).attribute("type"))
            .map_err(|_| {
                Diagnostic::error("Missing identity", "An identity block is required")
                    .with_attribute(AttributePath::new("identity"))
            })?;
        Ok(ClusterConfig {
            id: LogAnalyticsClusterId::new(&self.subscription_id, resource_group, name),
            location: required_string(config, "location")?,
            identity_type,
            size_gb: optional_i64(config, "size_gb").unwrap_or(DEFAULT_SIZE_GB),
            tags: tags(config),
        })
    }

    async fn wait_for_provisioning(
        &self,
        ctx: &Context,
        id: &LogAnalyticsClusterId,
        timeout: std::time::Duration,
    ) -> Result<Cluster, Diagnostic> {
        let client = self.client()?;
        StateWaiter::new(id.describe(), timeout)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &provisioning(), move || async move {
                Refreshed::from_lookup(client.get(id).await, Cluster::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Cluster did not finish provisioning", &e))?;

        client
            .get(id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))
    }

    async fn create_cluster(
        &self,
        ctx: &Context,
        cfg: &ClusterConfig,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        require_absent(client.get(&cfg.id).await, TYPE_NAME, &cfg.id.id())?;

        let body = Cluster {
            location: cfg.location.clone(),
            tags: cfg.tags.clone(),
            identity: Some(Identity {
                identity_type: cfg.identity_type.clone(),
                ..Default::default()
            }),
            sku: Some(ClusterSku::capacity_reservation(cfg.size_gb)),
            ..Default::default()
        };
        client
            .create_or_update(&cfg.id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to create {}", cfg.id.describe()), &e))?;

        let cluster = self
            .wait_for_provisioning(ctx, &cfg.id, TIMEOUTS.create)
            .await?;
        Ok(flatten(&cfg.id, &cluster, Some(config)))
    }

    async fn update_cluster(
        &self,
        ctx: &Context,
        cfg: &ClusterConfig,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let patch = ClusterPatch {
            tags: Some(cfg.tags.clone().unwrap_or_default()),
            sku: Some(ClusterSku::capacity_reservation(cfg.size_gb)),
            properties: None,
        };
        client
            .update(&cfg.id, &patch)
            .await
            .map_err(|e| api_error(format!("Failed to update {}", cfg.id.describe()), &e))?;

        let cluster = self
            .wait_for_provisioning(ctx, &cfg.id, TIMEOUTS.update)
            .await?;
        Ok(flatten(&cfg.id, &cluster, Some(config)))
    }

    async fn destroy(&self, ctx: &Context, prior_state: &DynamicValue) -> Result<(), Diagnostic> {
        let client = self.client()?;
        let raw = state_id(prior_state, TYPE_NAME)?;
        let id = &parse_id(LogAnalyticsClusterId::parse, &raw)?;

        tracing::info!("Deleting {}", id.describe());
        match client.delete(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(api_error(format!("Failed to delete {}", id.describe()), &e)),
        }

        StateWaiter::new(id.describe(), TIMEOUTS.delete)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &UntilDeleted, move || async move {
                Refreshed::from_lookup(client.get(id).await, Cluster::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Cluster was not deleted", &e))?;
        Ok(())
    }
}

struct ClusterConfig {
    id: LogAnalyticsClusterId,
    location: String,
    identity_type: String,
    size_gb: i64,
    tags: Option<Tags>,
}

fn flatten(id: &LogAnalyticsClusterId, cluster: &Cluster, prior: Option<&DynamicValue>) -> DynamicValue {
    let mut state = DynamicValue::object();
    let prior_location = prior.and_then(|p| optional_string(p, "location"));

    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(
        &mut state,
        "location",
        Some(location_for_state(prior_location, &cluster.location)),
    );
    put_i64(&mut state, "size_gb", cluster.sku.as_ref().map(|s| s.capacity));
    put_string(
        &mut state,
        "cluster_id",
        cluster
            .properties
            .as_ref()
            .and_then(|p| p.cluster_id.clone()),
    );
    put_tags(&mut state, cluster.tags.as_ref());

    let identity = cluster
        .identity
        .as_ref()
        .map(|identity| {
            let mut block = std::collections::HashMap::new();
            block.insert(
                "type".to_string(),
                Dynamic::String(identity.identity_type.clone()),
            );
            block.insert(
                "principal_id".to_string(),
                identity.principal_id.clone().into(),
            );
            block.insert("tenant_id".to_string(), identity.tenant_id.clone().into());
            vec![Dynamic::Map(block)]
        })
        .unwrap_or_default();
    let _ = state.set_list(&AttributePath::new("identity"), identity);

    state
}

#[async_trait]
impl Resource for ClusterResource {
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
        ValidateResourceConfigResponse {
            diagnostics: Self::schema_definition().validate_config(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result = match self.extract_config(&request.config) {
            Ok(cfg) => {
                tracing::info!("Creating {}", cfg.id.describe());
                self.create_cluster(&ctx, &cfg, &request.config).await
            }
            Err(diag) => Err(diag),
        };
        match result {
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
            .and_then(|raw| parse_id(LogAnalyticsClusterId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(cluster) => {
                ReadResourceResponse::found(flatten(&id, &cluster, Some(&request.current_state)))
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
        let result = match self.extract_config(&request.config) {
            Ok(cfg) => {
                tracing::info!("Updating {}", cfg.id.describe());
                self.update_cluster(&ctx, &cfg, &request.config).await
            }
            Err(diag) => Err(diag),
        };
        match result {
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
impl ResourceWithConfigure for ClusterResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.log_analytics.clusters.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ClusterResource {
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
            LogAnalyticsClusterId::parse,
        );
        response
    }
}

#[cfg(test)]
#[path = "./resource_cluster_test.rs"]
mod resource_cluster_test;
