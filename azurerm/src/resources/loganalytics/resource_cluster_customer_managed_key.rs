//! Customer-managed key for a Log Analytics cluster
//!
//! Not a separate ARM object: the key lives in the cluster's
//! `keyVaultProperties`, so this resource shares the cluster's ID and
//! patches that one property.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_validating_id;
use tfplug::plan_modifier::RequiresReplace;
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
use crate::api::loganalytics::clusters::{
    Cluster, ClusterPatch, ClusterPatchProperties, KeyVaultProperties,
};
use crate::api::loganalytics::ClustersClient;
use crate::ids::{KeyVaultKeyId, LogAnalyticsClusterId, ResourceId};
use crate::poll::{Refreshed, StateWaiter};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, import_as_exists, not_configured, parse_id, put_string, read_within,
    required_string, state_id, wait_error, Timeouts, POLL_INTERVAL,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_log_analytics_cluster_customer_managed_key";
const TIMEOUTS: Timeouts = Timeouts::minutes(360, 5, 360, 30);

#[derive(Default)]
pub struct ClusterCustomerManagedKeyResource {
    client: Option<ClustersClient>,
}

impl ClusterCustomerManagedKeyResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: ClustersClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&ClustersClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages the customer-managed key of a Log Analytics cluster")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("log_analytics_cluster_id", AttributeType::String)
                    .description("The ID of the Log Analytics cluster")
                    .required()
                    .validator(validate::resource_id::<LogAnalyticsClusterId>())
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("key_vault_key_id", AttributeType::String)
                    .description("The Key Vault key to encrypt the cluster with")
                    .required()
                    .validator(validate::key_vault_key_id())
                    .build(),
            )
            .build()
    }

    fn extract_config(
        config: &DynamicValue,
    ) -> Result<(LogAnalyticsClusterId, KeyVaultKeyId), Diagnostic> {
        let cluster_id = parse_id(
            LogAnalyticsClusterId::parse,
            &required_string(config, "log_analytics_cluster_id")?,
        )?;
        let key_id = parse_id(
            KeyVaultKeyId::parse,
            &required_string(config, "key_vault_key_id")?,
        )?;
        Ok((cluster_id, key_id))
    }

    /// PATCH the key properties and wait for the cluster to settle
    async fn set_key(
        &self,
        ctx: &Context,
        id: &LogAnalyticsClusterId,
        key: KeyVaultProperties,
        timeout: std::time::Duration,
    ) -> Result<Cluster, Diagnostic> {
        let client = self.client()?;
        let patch = ClusterPatch {
            properties: Some(ClusterPatchProperties {
                key_vault_properties: key,
            }),
            ..Default::default()
        };
        client
            .update(id, &patch)
            .await
            .map_err(|e| api_error(format!("Failed to update key for {}", id.describe()), &e))?;

        StateWaiter::new(id.describe(), timeout)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &provisioning(), move || async move {
                Refreshed::from_lookup(client.get(id).await, Cluster::provisioning_state)
            })
            .await
            .map_err(|e| wait_error("Cluster did not finish updating its key", &e))?;

        client
            .get(id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))
    }

    async fn create_key(&self, ctx: &Context, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let (id, key) = Self::extract_config(config)?;

        let existing = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        if existing.key_vault_properties().is_some() {
            return Err(import_as_exists(TYPE_NAME, &id.id()));
        }

        let cluster = self
            .set_key(ctx, &id, expand_key(&key), TIMEOUTS.create)
            .await?;
        flatten(&id, &cluster).ok_or_else(|| {
            Diagnostic::error(
                "Key not applied",
                format!("{} reports no customer-managed key", id.describe()),
            )
        })
    }
}

fn expand_key(key: &KeyVaultKeyId) -> KeyVaultProperties {
    KeyVaultProperties {
        key_vault_uri: key.key_vault_base_url.clone(),
        key_name: key.name.clone(),
        key_version: key.version.clone().unwrap_or_default(),
    }
}

/// `None` once the cluster carries no key
fn flatten(id: &LogAnalyticsClusterId, cluster: &Cluster) -> Option<DynamicValue> {
    let props = cluster.key_vault_properties()?;
    let base = if props.key_vault_uri.ends_with('/') {
        props.key_vault_uri.clone()
    } else {
        format!("{}/", props.key_vault_uri)
    };
    let key = KeyVaultKeyId {
        key_vault_base_url: base,
        name: props.key_name.clone(),
        version: Some(props.key_version.clone()).filter(|v| !v.is_empty()),
    };

    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "log_analytics_cluster_id", Some(id.to_string()));
    put_string(&mut state, "key_vault_key_id", Some(key.to_string()));
    Some(state)
}

#[async_trait]
impl Resource for ClusterCustomerManagedKeyResource {
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
        match self.create_key(&ctx, &request.config).await {
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
            Ok(cluster) => match flatten(&id, &cluster) {
                Some(state) => ReadResourceResponse::found(state),
                None => {
                    tracing::warn!("{} has no customer-managed key - removing from state", id.describe());
                    ReadResourceResponse::removed()
                }
            },
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
        let (id, key) = match Self::extract_config(&request.config) {
            Ok(parsed) => parsed,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };

        match self.set_key(&ctx, &id, expand_key(&key), TIMEOUTS.update).await {
            Ok(cluster) => match flatten(&id, &cluster) {
                Some(new_state) => UpdateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics: vec![],
                    new_identity: None,
                },
                None => UpdateResourceResponse::failed(
                    request.prior_state,
                    Diagnostic::error(
                        "Key not applied",
                        format!("{} reports no customer-managed key", id.describe()),
                    ),
                ),
            },
            Err(diag) => UpdateResourceResponse::failed(request.prior_state, diag),
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];
        let id = state_id(&request.prior_state, TYPE_NAME)
            .and_then(|raw| parse_id(LogAnalyticsClusterId::parse, &raw));
        match id {
            Ok(id) => {
                tracing::info!("Removing customer-managed key from {}", id.describe());
                if let Err(diag) = self
                    .set_key(&ctx, &id, KeyVaultProperties::default(), TIMEOUTS.delete)
                    .await
                {
                    diagnostics.push(diag);
                }
            }
            Err(diag) => diagnostics.push(diag),
        }
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ClusterCustomerManagedKeyResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => self.client = Some(data.clients.log_analytics.clusters.clone()),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ClusterCustomerManagedKeyResource {
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
mod tests {
    use super::*;
    use crate::resources::test_support::{json, test_clients, SUBSCRIPTION};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn path() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.OperationalInsights/clusters/cluster1",
            SUBSCRIPTION
        )
    }

    fn cluster_body(key: serde_json::Value) -> String {
        json!({
            "id": path(),
            "name": "cluster1",
            "location": "westeurope",
            "properties": {"provisioningState": "Succeeded", "keyVaultProperties": key}
        })
        .to_string()
    }

    fn config() -> DynamicValue {
        json(json!({
            "log_analytics_cluster_id": path(),
            "key_vault_key_id": "https://vault1.vault.azure.net/keys/key1/v1"
        }))
    }

    #[test]
    fn flatten_rebuilds_key_url() {
        let id = LogAnalyticsClusterId::parse(&path()).unwrap();
        let cluster: Cluster = serde_json::from_str(&cluster_body(json!({
            "keyVaultUri": "https://vault1.vault.azure.net",
            "keyName": "key1",
            "keyVersion": ""
        })))
        .unwrap();

        let state = flatten(&id, &cluster).unwrap();
        assert_eq!(
            state.get_string(&AttributePath::new("key_vault_key_id")).unwrap(),
            "https://vault1.vault.azure.net/keys/key1"
        );

        let cleared: Cluster = serde_json::from_str(&cluster_body(json!({}))).unwrap();
        assert!(flatten(&id, &cleared).is_none());
    }

    #[tokio::test]
    async fn create_patches_key_properties() {
        let mut server = Server::new_async().await;
        let _before = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(cluster_body(json!({})))
            .expect(1)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", path().as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "properties": {"keyVaultProperties": {
                    "keyVaultUri": "https://vault1.vault.azure.net/",
                    "keyName": "key1",
                    "keyVersion": "v1"
                }}
            })))
            .with_status(200)
            .create_async()
            .await;
        let _after = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(cluster_body(json!({
                "keyVaultUri": "https://vault1.vault.azure.net/",
                "keyName": "key1",
                "keyVersion": "v1"
            })))
            .create_async()
            .await;

        let response = ClusterCustomerManagedKeyResource::with_client(
            test_clients(&server.url()).log_analytics.clusters,
        )
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: config(),
                config: config(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        patch.assert_async().await;
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("key_vault_key_id"))
                .unwrap(),
            "https://vault1.vault.azure.net/keys/key1/v1"
        );
    }

    #[tokio::test]
    async fn create_refuses_cluster_with_key() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(cluster_body(json!({
                "keyVaultUri": "https://other.vault.azure.net/",
                "keyName": "k"
            })))
            .create_async()
            .await;

        let response = ClusterCustomerManagedKeyResource::with_client(
            test_clients(&server.url()).log_analytics.clusters,
        )
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: config(),
                config: config(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Resource already exists");
    }
}
