//! Managed disk data source

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
use crate::api::compute::DisksClient;
use crate::ids::{ManagedDiskId, ResourceId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::compute::resource_managed_disk::flatten;
use crate::resources::compute::ManagedDiskResource;
use crate::resources::{api_error, not_configured};

const TYPE_NAME: &str = "azurerm_managed_disk";

#[derive(Default)]
pub struct ManagedDiskDataSource {
    client: Option<DisksClient>,
    subscription_id: String,
}

impl ManagedDiskDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(subscription_id: impl Into<String>, client: DisksClient) -> Self {
        Self {
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn schema_definition() -> Schema {
        lookup_schema(
            ManagedDiskResource::schema_definition(),
            "Gets information about an existing managed disk",
        )
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client.as_ref().ok_or_else(not_configured)?;
        let (resource_group, name) = lookup_keys(config)?;
        let id = ManagedDiskId::new(&self.subscription_id, resource_group, name);

        match client.get(&id).await {
            Ok(disk) => Ok(flatten(&id, &disk, None)),
            Err(e) if e.is_not_found() => Err(Diagnostic::error(
                "Managed disk not found",
                format!("{} was not found", id.describe()),
            )),
            Err(e) => Err(api_error(format!("Failed to read {}", id.describe()), &e)),
        }
    }
}

#[async_trait]
impl DataSource for ManagedDiskDataSource {
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
        match self.lookup(&request.config).await {
            Ok(state) => ReadDataSourceResponse::ok(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ManagedDiskDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.compute.disks.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::resources::test_support::{json, test_clients, SUBSCRIPTION};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{AttributePath, ClientCapabilities};

    fn path() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Compute/disks/disk1",
            SUBSCRIPTION
        )
    }

    fn request(config: serde_json::Value) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: TYPE_NAME.to_string(),
            config: json(config),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    async fn test_read_existing_disk() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "id": path(),
                    "name": "disk1",
                    "location": "westeurope",
                    "zones": ["1"],
                    "sku": {"name": "StandardSSD_LRS"},
                    "properties": {
                        "provisioningState": "Succeeded",
                        "creationData": {"createOption": "Empty"},
                        "diskSizeGB": 32,
                        "networkAccessPolicy": "DenyAll"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let data_source = ManagedDiskDataSource::with_client(
            SUBSCRIPTION,
            test_clients(&server.url()).compute.disks,
        );
        let response = data_source
            .read(
                Context::new(),
                request(json!({"name": "disk1", "resource_group_name": "rg1"})),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.state;
        assert_eq!(
            state.get_string(&AttributePath::new("storage_account_type")).unwrap(),
            "StandardSSD_LRS"
        );
        assert_eq!(state.get_i64(&AttributePath::new("disk_size_gb")).unwrap(), 32);
        assert_eq!(state.get_string(&AttributePath::new("zone")).unwrap(), "1");
        assert_eq!(
            state.get_string(&AttributePath::new("network_access_policy")).unwrap(),
            "DenyAll"
        );
    }

    #[tokio::test]
    async fn test_validate_requires_lookup_keys() {
        let response = ManagedDiskDataSource::new()
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: json(json!({"name": "disk1"})),
                },
            )
            .await;
        assert!(!response.diagnostics.is_empty());
    }
}
