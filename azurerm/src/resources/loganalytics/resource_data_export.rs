//! Log Analytics data export rule resource

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

use super::workspace_id_attribute;
use crate::api::loganalytics::data_exports::{DataExport, DataExportProperties, Destination};
use crate::api::loganalytics::DataExportsClient;
use crate::ids::{LogAnalyticsDataExportId, LogAnalyticsWorkspaceId, ResourceId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, name_attribute, not_configured, optional_bool, parse_id, put_bool,
    put_string, put_string_list, read_within, require_absent, required_string,
    resource_group_name_attribute, state_id, string_list, wait_for_deletion, Timeouts,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_log_analytics_data_export_rule";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

#[derive(Default)]
pub struct DataExportResource {
    client: Option<DataExportsClient>,
}

impl DataExportResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: DataExportsClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&DataExportsClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Log Analytics data export rule")
            .attribute(id_attribute())
            .attribute(name_attribute(
                "Name of the data export rule",
                validate::data_export_name(),
            ))
            .attribute(resource_group_name_attribute())
            .attribute(workspace_id_attribute("workspace_resource_id"))
            .attribute(
                AttributeBuilder::new("destination_resource_id", AttributeType::String)
                    .description("Storage account or Event Hub namespace that receives the data")
                    .required()
                    .validator(validate::arm_resource_id())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("table_names", AttributeType::Set(Box::new(AttributeType::String)))
                    .description("Tables to export")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .description("Whether the rule is active; defaults to false")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("export_rule_id", AttributeType::String)
                    .description("The GUID of the rule")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .build()
    }

    fn extract_config(config: &DynamicValue) -> Result<(LogAnalyticsDataExportId, DataExport), Diagnostic> {
        let workspace = parse_id(
            LogAnalyticsWorkspaceId::parse,
            &required_string(config, "workspace_resource_id")?,
        )?;
        let id = LogAnalyticsDataExportId::new(
            &workspace.subscription_id,
            required_string(config, "resource_group_name")?,
            &workspace.name,
            required_string(config, "name")?,
        );
        let body = DataExport {
            properties: Some(DataExportProperties {
                table_names: string_list(config, "table_names"),
                destination: Destination {
                    resource_id: required_string(config, "destination_resource_id")?,
                },
                enable: Some(optional_bool(config, "enabled").unwrap_or(false)),
                ..Default::default()
            }),
            ..Default::default()
        };
        Ok((id, body))
    }

    async fn write(
        &self,
        config: &DynamicValue,
        creating: bool,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let (id, body) = Self::extract_config(config)?;
        if creating {
            require_absent(client.get(&id).await, TYPE_NAME, &id.id())?;
        }

        client
            .create_or_update(&id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to write {}", id.describe()), &e))?;

        let export = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        Ok(flatten(&id, &export))
    }
}

fn flatten(id: &LogAnalyticsDataExportId, export: &DataExport) -> DynamicValue {
    let props = export.properties.clone().unwrap_or_default();
    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(
        &mut state,
        "workspace_resource_id",
        Some(id.workspace_id().to_string()),
    );
    put_string(
        &mut state,
        "destination_resource_id",
        Some(props.destination.resource_id),
    );
    put_string_list(&mut state, "table_names", props.table_names);
    put_bool(&mut state, "enabled", Some(props.enable.unwrap_or(false)));
    put_string(&mut state, "export_rule_id", props.data_export_id);
    state
}

#[async_trait]
impl Resource for DataExportResource {
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
        let tables = request
            .config
            .get_list(&AttributePath::new("table_names"))
            .unwrap_or_default();
        if request.config.is_set(&AttributePath::new("table_names")) && tables.is_empty() {
            diagnostics.push(
                Diagnostic::error("Invalid table_names", "At least one table must be exported")
                    .with_attribute(AttributePath::new("table_names")),
            );
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
            .and_then(|raw| parse_id(LogAnalyticsDataExportId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(export) => ReadResourceResponse::found(flatten(&id, &export)),
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
                .and_then(|raw| parse_id(LogAnalyticsDataExportId::parse, &raw)),
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
impl ResourceWithConfigure for DataExportResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => self.client = Some(data.clients.log_analytics.data_exports.clone()),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for DataExportResource {
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
            LogAnalyticsDataExportId::parse,
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

    fn path() -> String {
        format!("{}/dataExports/export1", workspace())
    }

    fn config() -> DynamicValue {
        json(json!({
            "name": "export1",
            "resource_group_name": "rg1",
            "workspace_resource_id": workspace(),
            "destination_resource_id": format!(
                "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1",
                SUBSCRIPTION
            ),
            "table_names": ["Heartbeat"],
            "enabled": true
        }))
    }

    fn remote_body() -> String {
        json!({
            // the service answers with the lower-case collection name
            "id": format!("{}/dataexports/export1", workspace()),
            "name": "export1",
            "properties": {
                "dataExportId": "55555555-5555-5555-5555-555555555555",
                "tableNames": ["Heartbeat"],
                "destination": {"resourceId": "/subscriptions/x/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1"},
                "enable": true
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn create_writes_rule_and_reads_back() {
        let mut server = Server::new_async().await;
        let _absent = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", path().as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "properties": {"tableNames": ["Heartbeat"], "enable": true}
            })))
            .with_status(200)
            .with_body(remote_body())
            .create_async()
            .await;
        let _present = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body())
            .create_async()
            .await;

        let response = DataExportResource::with_client(
            test_clients(&server.url()).log_analytics.data_exports,
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
        put.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path());
        assert_eq!(
            state.get_string(&AttributePath::new("export_rule_id")).unwrap(),
            "55555555-5555-5555-5555-555555555555"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("workspace_resource_id")).unwrap(),
            workspace()
        );
    }

    #[tokio::test]
    async fn read_accepts_lower_case_state_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body())
            .create_async()
            .await;

        let response = DataExportResource::with_client(
            test_clients(&server.url()).log_analytics.data_exports,
        )
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: TYPE_NAME.to_string(),
                current_state: json(json!({"id": format!("{}/dataexports/export1", workspace())})),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
                current_identity: None,
            },
        )
        .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state.unwrap();
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path());
    }

    #[tokio::test]
    async fn validate_rejects_empty_table_list() {
        let mut config = config();
        config
            .set_list(&AttributePath::new("table_names"), vec![])
            .unwrap();
        let response = DataExportResource::new()
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
        assert_eq!(response.diagnostics[0].summary, "Invalid table_names");
    }

    #[tokio::test]
    async fn import_accepts_both_casings() {
        for id in [path(), format!("{}/dataexports/export1", workspace())] {
            let response = DataExportResource::new()
                .import_state(
                    Context::new(),
                    ImportResourceStateRequest {
                        type_name: TYPE_NAME.to_string(),
                        id,
                        client_capabilities: ClientCapabilities::default(),
                        identity: None,
                    },
                )
                .await;
            assert!(response.diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn delete_waits_for_404() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;
        let gone = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let response = DataExportResource::with_client(
            test_clients(&server.url()).log_analytics.data_exports,
        )
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: json(json!({"id": path()})),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        delete.assert_async().await;
        gone.assert_async().await;
    }
}
