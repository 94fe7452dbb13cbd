//! Log Analytics storage insights resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_validating_id;
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
use tfplug::validator::StringNotEmpty;

use super::workspace_id_attribute;
use crate::api::loganalytics::storage_insights::{
    StorageAccount, StorageInsight, StorageInsightProperties,
};
use crate::api::loganalytics::StorageInsightsClient;
use crate::ids::{LogAnalyticsStorageInsightsId, LogAnalyticsWorkspaceId, ResourceId, StorageAccountId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, name_attribute, not_configured, optional_string, parse_id, put_string,
    put_string_list, put_tags, read_within, require_absent, required_string,
    resource_group_name_attribute, state_id, string_list, tags, tags_attribute, wait_for_deletion,
    Timeouts,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_log_analytics_storage_insights";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

#[derive(Default)]
pub struct StorageInsightsResource {
    client: Option<StorageInsightsClient>,
}

impl StorageInsightsResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: StorageInsightsClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&StorageInsightsClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Log Analytics storage insights configuration")
            .attribute(id_attribute())
            .attribute(name_attribute(
                "Name of the storage insights configuration",
                validate::storage_insights_name(),
            ))
            .attribute(resource_group_name_attribute())
            .attribute(workspace_id_attribute("workspace_id"))
            .attribute(
                AttributeBuilder::new("storage_account_id", AttributeType::String)
                    .description("Storage account to read diagnostics from")
                    .required()
                    .validator(validate::resource_id::<StorageAccountId>())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("storage_account_key", AttributeType::String)
                    .description("Access key for the storage account; never returned by the API")
                    .required()
                    .sensitive()
                    .validator(Box::new(StringNotEmpty))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "blob_container_names",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("Blob containers holding Azure diagnostics logs")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("table_names", AttributeType::Set(Box::new(AttributeType::String)))
                    .description("Tables holding Azure diagnostics logs")
                    .optional()
                    .build(),
            )
            .attribute(tags_attribute())
            .build()
    }

    fn extract_config(
        config: &DynamicValue,
    ) -> Result<(LogAnalyticsStorageInsightsId, StorageInsight), Diagnostic> {
        let workspace = parse_id(
            LogAnalyticsWorkspaceId::parse,
            &required_string(config, "workspace_id")?,
        )?;
        let id = LogAnalyticsStorageInsightsId::new(
            &workspace.subscription_id,
            required_string(config, "resource_group_name")?,
            &workspace.name,
            required_string(config, "name")?,
        );
        let body = StorageInsight {
            tags: tags(config),
            properties: Some(StorageInsightProperties {
                containers: string_list(config, "blob_container_names"),
                tables: string_list(config, "table_names"),
                storage_account: StorageAccount {
                    id: required_string(config, "storage_account_id")?,
                    key: Some(required_string(config, "storage_account_key")?),
                },
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

        let insight = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        Ok(flatten(&id, &insight, optional_string(config, "storage_account_key")))
    }
}

/// The key is write-only, so the caller supplies the last known value
fn flatten(
    id: &LogAnalyticsStorageInsightsId,
    insight: &StorageInsight,
    storage_account_key: Option<String>,
) -> DynamicValue {
    let props = insight.properties.clone().unwrap_or_default();
    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
    put_string(&mut state, "workspace_id", Some(id.workspace_id().to_string()));
    put_string(&mut state, "storage_account_id", Some(props.storage_account.id));
    put_string(&mut state, "storage_account_key", storage_account_key);
    put_string_list(&mut state, "blob_container_names", props.containers);
    put_string_list(&mut state, "table_names", props.tables);
    put_tags(&mut state, insight.tags.as_ref());
    state
}

#[async_trait]
impl Resource for StorageInsightsResource {
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
        let config = &request.config;
        let mut diagnostics = Self::schema_definition().validate_config(config);

        let pending = |name: &str| {
            config
                .get_value(&AttributePath::new(name))
                .is_some_and(|v| v.is_unknown())
        };
        if !pending("blob_container_names")
            && !pending("table_names")
            && string_list(config, "blob_container_names").is_empty()
            && string_list(config, "table_names").is_empty()
        {
            diagnostics.push(Diagnostic::error(
                "Missing storage targets",
                "At least one of blob_container_names or table_names must be set",
            ));
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
            .and_then(|raw| parse_id(LogAnalyticsStorageInsightsId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(insight) => {
                let key = optional_string(&request.current_state, "storage_account_key");
                ReadResourceResponse::found(flatten(&id, &insight, key))
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
                .and_then(|raw| parse_id(LogAnalyticsStorageInsightsId::parse, &raw)),
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
impl ResourceWithConfigure for StorageInsightsResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => self.client = Some(data.clients.log_analytics.storage_insights.clone()),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for StorageInsightsResource {
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
            LogAnalyticsStorageInsightsId::parse,
        );
        response
    }
}
