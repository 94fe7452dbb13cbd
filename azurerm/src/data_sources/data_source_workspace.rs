//! Log Analytics workspace data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::Schema;
use tfplug::types::{Diagnostic, DynamicValue};

use super::{lookup_keys, lookup_schema};
use crate::api::loganalytics::WorkspacesClient;
use crate::ids::{LogAnalyticsWorkspaceId, ResourceId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::loganalytics::resource_workspace::flatten;
use crate::resources::loganalytics::WorkspaceResource;
use crate::resources::{api_error, not_configured};

const TYPE_NAME: &str = "azurerm_log_analytics_workspace";

#[derive(Default)]
pub struct WorkspaceDataSource {
    client: Option<WorkspacesClient>,
    subscription_id: String,
}

impl WorkspaceDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(subscription_id: impl Into<String>, client: WorkspacesClient) -> Self {
        Self {
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn schema_definition() -> Schema {
        lookup_schema(
            WorkspaceResource::schema_definition(),
            "Gets information about an existing Log Analytics workspace",
        )
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client.as_ref().ok_or_else(not_configured)?;
        let (resource_group, name) = lookup_keys(config)?;
        let id = LogAnalyticsWorkspaceId::new(&self.subscription_id, resource_group, name);

        let workspace = client.get(&id).await.map_err(|e| {
            if e.is_not_found() {
                Diagnostic::error(
                    "Workspace not found",
                    format!("{} was not found", id.describe()),
                )
            } else {
                api_error(format!("Failed to read {}", id.describe()), &e)
            }
        })?;

        let keys = match client.shared_keys(&id).await {
            Ok(keys) => Some(keys),
            Err(e) => {
                tracing::warn!("Unable to list shared keys for {}: {}", id.describe(), e);
                None
            }
        };
        Ok(flatten(&id, &workspace, keys.as_ref(), None))
    }
}

#[async_trait]
impl DataSource for WorkspaceDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: Self::schema_definition().validate_config(&request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        tracing::debug!("Reading workspace data source");
        match self.lookup(&request.config).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for WorkspaceDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.log_analytics.workspaces.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
