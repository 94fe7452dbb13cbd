//! Terraform provider for Azure Log Analytics and managed disks
//!
//! [`AzureRmProvider`] resolves credentials, builds one shared [`api::Clients`]
//! bag in `configure` and hands every resource and data source the typed
//! client it needs through [`provider_data::AzureRmProviderData`].

pub mod api;
pub mod config;
pub mod data_sources;
pub mod ids;
pub mod poll;
pub mod provider_data;
pub mod resources;
pub mod validate;

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, ServerCapabilities};
use tfplug::validator::{IsUuid, StringInSlice};

use config::{ConfigError, ProviderConfig};
use provider_data::AzureRmProviderData;

pub struct AzureRmProvider {
    configured: bool,
}

impl Default for AzureRmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureRmProvider {
    pub fn new() -> Self {
        Self { configured: false }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    fn schema_definition() -> Schema {
        let setting = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .build()
        };
        // environment fallbacks are checked in `configure`
        let uuid_setting = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
                .validator(Box::new(IsUuid))
                .build()
        };

        SchemaBuilder::new()
            .version(0)
            .description("Azure Resource Manager provider for Log Analytics and managed disks")
            .attribute(uuid_setting(
                "subscription_id",
                "Subscription to manage. Falls back to ARM_SUBSCRIPTION_ID",
            ))
            .attribute(uuid_setting(
                "tenant_id",
                "Azure AD tenant. Falls back to ARM_TENANT_ID",
            ))
            .attribute(setting(
                "client_id",
                "Service principal application ID. Falls back to ARM_CLIENT_ID",
            ))
            .attribute(
                AttributeBuilder::new("client_secret", AttributeType::String)
                    .description("Service principal secret. Falls back to ARM_CLIENT_SECRET")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment", AttributeType::String)
                    .description("Cloud environment: public, usgovernment or china")
                    .optional()
                    .validator(Box::new(
                        StringInSlice::new(&["public", "usgovernment", "china"]).ignore_case(),
                    ))
                    .build(),
            )
            .attribute(setting(
                "resource_manager_endpoint",
                "Overrides the Resource Manager endpoint of the environment",
            ))
            .attribute(setting(
                "authority_host",
                "Overrides the Azure AD authority of the environment",
            ))
            .build()
    }
}

fn config_diagnostic(error: &ConfigError) -> Diagnostic {
    let diag = Diagnostic::error("Invalid provider configuration", error.to_string());
    match error.attribute() {
        Some(attribute) => diag.with_attribute(AttributePath::new(attribute)),
        None => diag,
    }
}

#[async_trait]
impl Provider for AzureRmProvider {
    fn type_name(&self) -> &str {
        "azurerm"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: true,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let resolved = match ProviderConfig::from_config(&request.config) {
            Ok(resolved) => resolved,
            Err(errors) => {
                return ConfigureProviderResponse {
                    diagnostics: errors.iter().map(config_diagnostic).collect(),
                    provider_data: None,
                }
            }
        };
        tracing::info!(
            subscription_id = %resolved.subscription_id,
            environment = %resolved.environment,
            "configuring provider"
        );

        match resolved.build_clients() {
            Ok(clients) => {
                self.configured = true;
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(std::sync::Arc::new(AzureRmProviderData::new(clients))),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![config_diagnostic(&e)],
                provider_data: None,
            },
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: Self::schema_definition().validate_config(&request.config),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        resources::factories()
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        data_sources::factories()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

    const SUB: &str = "00000000-0000-0000-0000-000000000001";
    const TENANT: &str = "00000000-0000-0000-0000-000000000002";

    fn config(pairs: &[(&str, &str)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Dynamic::String(v.to_string())))
                .collect(),
        ))
    }

    fn clear_env() {
        for var in [
            "ARM_SUBSCRIPTION_ID",
            "ARM_TENANT_ID",
            "ARM_CLIENT_ID",
            "ARM_CLIENT_SECRET",
            "ARM_ENVIRONMENT",
            "ARM_RESOURCE_MANAGER_ENDPOINT",
            "ARM_AUTHORITY_HOST",
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn schema_marks_secret_sensitive() {
        let response = AzureRmProvider::new()
            .schema(Context::new(), ProviderSchemaRequest)
            .await;
        assert!(response.schema.attribute("client_secret").unwrap().sensitive);
        assert!(!response.schema.attribute("client_id").unwrap().sensitive);
    }

    #[tokio::test]
    async fn validate_rejects_malformed_uuids() {
        let response = AzureRmProvider::new()
            .validate(
                Context::new(),
                ValidateProviderConfigRequest {
                    config: config(&[("subscription_id", "nope"), ("tenant_id", TENANT)]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "subscription_id is not a valid UUID"
        );
    }

    #[tokio::test]
    #[serial]
    async fn configure_builds_provider_data() {
        clear_env();
        let mut provider = AzureRmProvider::new();
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: "1.9.0".to_string(),
                    config: config(&[
                        ("subscription_id", SUB),
                        ("tenant_id", TENANT),
                        ("client_id", "app"),
                        ("client_secret", "secret"),
                    ]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(provider.is_configured());
        let data = AzureRmProviderData::from_any(response.provider_data).unwrap();
        assert_eq!(data.clients.subscription_id, SUB);
    }

    #[tokio::test]
    #[serial]
    async fn configure_reports_missing_credentials() {
        clear_env();
        let mut provider = AzureRmProvider::new();
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: "1.9.0".to_string(),
                    config: config(&[("subscription_id", SUB)]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(!provider.is_configured());
        assert!(response.provider_data.is_none());
        let details: Vec<_> = response.diagnostics.iter().map(|d| d.detail.as_str()).collect();
        assert_eq!(details.len(), 3);
        assert!(details[0].contains("ARM_TENANT_ID"));
    }

    #[test]
    fn registers_every_resource_and_data_source() {
        let provider = AzureRmProvider::new();
        let resources = provider.resources();
        assert_eq!(resources.len(), 11);
        assert!(resources.contains_key("azurerm_log_analytics_datasource_windows_event"));
        assert!(resources.contains_key("azurerm_managed_disk"));

        let data_sources = provider.data_sources();
        assert!(data_sources.contains_key("azurerm_log_analytics_workspace"));
        assert!(data_sources.contains_key("azurerm_managed_disk"));
    }
}
