//! Log Analytics linked storage account resource
//!
//! The resource is named by its data source type, so a workspace holds at
//! most one link per type.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_validating_id;
use tfplug::plan_modifier::RequiresReplaceIgnoreCase;
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
use tfplug::validator::StringInSlice;

use super::workspace_id_attribute;
use crate::api::loganalytics::linked_storage_accounts::{
    LinkedStorageAccount, LinkedStorageAccountProperties,
};
use crate::api::loganalytics::LinkedStorageAccountsClient;
use crate::ids::{
    LogAnalyticsLinkedStorageAccountId, LogAnalyticsWorkspaceId, ResourceId, StorageAccountId,
};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, not_configured, parse_id, put_string, put_string_list, read_within,
    require_absent, required_string, resource_group_name_attribute, state_id, string_list,
    wait_for_deletion, Timeouts,
};

const TYPE_NAME: &str = "azurerm_log_analytics_linked_storage_account";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

pub const DATA_SOURCE_TYPES: [&str; 5] = ["CustomLogs", "AzureWatson", "Query", "Alerts", "Ingestion"];

/// Documented spelling of a data source type, matched case-insensitively
fn canonical_data_source_type(value: &str) -> String {
    DATA_SOURCE_TYPES
        .iter()
        .find(|t| t.eq_ignore_ascii_case(value))
        .map(|t| t.to_string())
        .unwrap_or_else(|| value.to_string())
}

#[derive(Default)]
pub struct LinkedStorageAccountResource {
    client: Option<LinkedStorageAccountsClient>,
}

impl LinkedStorageAccountResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: LinkedStorageAccountsClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&LinkedStorageAccountsClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Links storage accounts to a Log Analytics workspace")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("data_source_type", AttributeType::String)
                    .description("Kind of data stored in the linked accounts")
                    .required()
                    .validator(Box::new(StringInSlice::new(&DATA_SOURCE_TYPES).ignore_case()))
                    .plan_modifier(Box::new(RequiresReplaceIgnoreCase))
                    .build(),
            )
            .attribute(resource_group_name_attribute())
            .attribute(workspace_id_attribute("workspace_resource_id"))
            .attribute(
                AttributeBuilder::new(
                    "storage_account_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("Storage accounts to link")
                .required()
                .build(),
            )
            .build()
    }

    fn extract_config(
        config: &DynamicValue,
    ) -> Result<(LogAnalyticsLinkedStorageAccountId, LinkedStorageAccount), Diagnostic> {
        let workspace = parse_id(
            LogAnalyticsWorkspaceId::parse,
            &required_string(config, "workspace_resource_id")?,
        )?;
        let data_source_type = canonical_data_source_type(&required_string(config, "data_source_type")?);
        let id = LogAnalyticsLinkedStorageAccountId::new(
            &workspace.subscription_id,
            required_string(config, "resource_group_name")?,
            &workspace.name,
            data_source_type,
        );
        let body = LinkedStorageAccount {
            properties: Some(LinkedStorageAccountProperties {
                storage_account_ids: string_list(config, "storage_account_ids"),
                ..Default::default()
            }),
            ..Default::default()
        };
        Ok((id, body))
    }

    async fn write(&self, config: &DynamicValue, creating: bool) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let (id, body) = Self::extract_config(config)?;
        if creating {
            require_absent(client.get(&id).await, TYPE_NAME, &id.id())?;
        }

        client
            .create_or_update(&id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to write {}", id.describe()), &e))?;

        let account = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        Ok(flatten(&id, &account))
    }
}

fn flatten(id: &LogAnalyticsLinkedStorageAccountId, account: &LinkedStorageAccount) -> DynamicValue {
    let props = account.properties.clone().unwrap_or_default();
    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(
        &mut state,
        "data_source_type",
        Some(canonical_data_source_type(&id.name)),
    );
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(
        &mut state,
        "workspace_resource_id",
        Some(id.workspace_id().to_string()),
    );
    put_string_list(&mut state, "storage_account_ids", props.storage_account_ids);
    state
}

#[async_trait]
impl Resource for LinkedStorageAccountResource {
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
        for (i, account) in string_list(&request.config, "storage_account_ids")
            .iter()
            .enumerate()
        {
            if let Err(e) = StorageAccountId::parse(account) {
                diagnostics.push(
                    Diagnostic::error("Invalid storage account ID", e.to_string()).with_attribute(
                        AttributePath::new("storage_account_ids").index(i as i64),
                    ),
                );
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.write(&request.config, true).await {
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
            .and_then(|raw| parse_id(LogAnalyticsLinkedStorageAccountId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(account) => ReadResourceResponse::found(flatten(&id, &account)),
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

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.write(&request.config, false).await {
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
                .and_then(|raw| parse_id(LogAnalyticsLinkedStorageAccountId::parse, &raw)),
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
impl ResourceWithConfigure for LinkedStorageAccountResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.log_analytics.linked_storage_accounts.clone())
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for LinkedStorageAccountResource {
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
            LogAnalyticsLinkedStorageAccountId::parse,
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
    use tfplug::types::ClientCapabilities;

    fn workspace() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/ws1",
            SUBSCRIPTION
        )
    }

    fn storage_account() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1",
            SUBSCRIPTION
        )
    }

    fn config(data_source_type: &str) -> DynamicValue {
        json(json!({
            "data_source_type": data_source_type,
            "resource_group_name": "rg1",
            "workspace_resource_id": workspace(),
            "storage_account_ids": [storage_account()]
        }))
    }

    #[test]
    fn data_source_type_is_canonicalised() {
        assert_eq!(canonical_data_source_type("customlogs"), "CustomLogs");
        assert_eq!(canonical_data_source_type("Query"), "Query");
        assert_eq!(canonical_data_source_type("Other"), "Other");
    }

    #[tokio::test]
    async fn validate_checks_each_storage_account() {
        let mut config = config("Query");
        config
            .set_string_list(
                &AttributePath::new("storage_account_ids"),
                vec![storage_account(), "/subscriptions/x/resourceGroups/rg".to_string()],
            )
            .unwrap();
        let response = LinkedStorageAccountResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid storage account ID");
    }

    #[tokio::test]
    async fn create_names_link_after_data_source_type() {
        let path = format!("{}/linkedStorageAccounts/CustomLogs", workspace());
        let mut server = Server::new_async().await;
        let _absent = server
            .mock("GET", path.as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", path.as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "properties": {"storageAccountIds": [storage_account()]}
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _present = server
            .mock("GET", path.as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "id": format!("{}/linkedstorageaccounts/customlogs", workspace()),
                    "properties": {"dataSourceType": "CustomLogs", "storageAccountIds": [storage_account()]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = LinkedStorageAccountResource::with_client(
            test_clients(&server.url()).log_analytics.linked_storage_accounts,
        )
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: config("customlogs"),
                config: config("customlogs"),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path);
        assert_eq!(
            state.get_string(&AttributePath::new("data_source_type")).unwrap(),
            "CustomLogs"
        );
    }

    #[tokio::test]
    async fn import_accepts_lower_case_collection() {
        let response = LinkedStorageAccountResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: format!("{}/linkedstorageaccounts/Query", workspace()),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
    }
}
