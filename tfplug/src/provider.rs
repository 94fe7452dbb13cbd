//! Provider trait, factories and instantiation helpers
//!
//! A provider hands out factories rather than instances. The host builds a
//! fresh resource or data source per request and passes it the provider data
//! produced by [`Provider::configure`].

use crate::context::Context;
use crate::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use crate::error::{Result, TfplugError};
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure, ResourceWithImportState};
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Every managed resource must be configurable and importable
pub trait ProviderResource: ResourceWithConfigure + ResourceWithImportState {}

impl<T: ResourceWithConfigure + ResourceWithImportState> ProviderResource for T {}

pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ProviderResource> + Send + Sync>;

pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSourceWithConfigure> + Send + Sync>;

/// Opaque provider data passed from configure to resources
pub type ProviderData = Arc<dyn Any + Send + Sync>;

#[async_trait]
pub trait Provider: Send + Sync {
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    async fn meta_schema(
        &self,
        ctx: Context,
        request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse;

    /// Build clients once; the returned provider_data is shared by every
    /// resource and data source instance
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    async fn stop(&self, ctx: Context, request: StopProviderRequest) -> StopProviderResponse;

    fn resources(&self) -> HashMap<String, ResourceFactory>;

    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub server_capabilities: ServerCapabilities,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderMetaSchemaRequest;

pub struct ProviderMetaSchemaResponse {
    pub schema: Option<Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<ProviderData>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct StopProviderRequest;

pub struct StopProviderResponse {
    pub error: Option<String>,
}

/// Builds a resource from its factory and hands it the provider data.
///
/// Configure diagnostics that carry errors fail the instantiation.
pub async fn instantiate_resource(
    ctx: &Context,
    factories: &HashMap<String, ResourceFactory>,
    type_name: &str,
    provider_data: Option<ProviderData>,
) -> Result<Box<dyn ProviderResource>> {
    let factory = factories
        .get(type_name)
        .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))?;

    let mut resource = factory();
    let response = resource
        .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
        .await;
    fail_on_errors(&response.diagnostics)?;

    tracing::debug!(resource = type_name, "resource instantiated");
    Ok(resource)
}

pub async fn instantiate_data_source(
    ctx: &Context,
    factories: &HashMap<String, DataSourceFactory>,
    type_name: &str,
    provider_data: Option<ProviderData>,
) -> Result<Box<dyn DataSourceWithConfigure>> {
    let factory = factories
        .get(type_name)
        .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()))?;

    let mut data_source = factory();
    let response = data_source
        .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
        .await;
    fail_on_errors(&response.diagnostics)?;

    tracing::debug!(data_source = type_name, "data source instantiated");
    Ok(data_source)
}

fn fail_on_errors(diagnostics: &[Diagnostic]) -> Result<()> {
    match diagnostics.iter().find(|d| d.is_error()) {
        Some(d) => Err(TfplugError::InvalidConfiguration(d.to_string())),
        None => Ok(()),
    }
}
