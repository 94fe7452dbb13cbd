//! Log Analytics workspace data sources
//!
//! Every data source kind is served by the same [`DataSourceResource`]. What
//! differs between kinds lives in one [`DataSourceKind`] entry: the Terraform
//! type name, the API `kind`, the kind-specific attributes, and the functions
//! that encode configuration into [`DataSourceProperties`] and decode it back.

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
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{IntBetween, StringNotEmpty};

use crate::api::loganalytics::data_sources::{
    DataSource, DataSourceProperties, WindowsEventProperties, WindowsEventType,
    WindowsPerformanceCounterProperties,
};
use crate::api::loganalytics::DataSourcesClient;
use crate::ids::{LogAnalyticsDataSourceId, ResourceId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, not_configured, parse_id, put_i64, put_string, put_string_list,
    read_within, require_absent, required_string, resource_group_name_attribute, state_id,
    string_list, wait_for_deletion, Timeouts,
};
use crate::validate;

const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

/// Kind-specific half of a data source resource
pub struct DataSourceKind {
    pub type_name: &'static str,
    /// Value of the `kind` discriminator on the wire
    pub api_kind: &'static str,
    pub description: &'static str,
    pub attributes: fn() -> Vec<Attribute>,
    /// Cross-field checks the schema validators cannot express
    pub check: fn(&DynamicValue) -> Vec<Diagnostic>,
    pub expand: fn(&DynamicValue) -> Result<DataSourceProperties, Diagnostic>,
    /// Writes the kind's attributes; `None` when the payload is another kind
    pub flatten: fn(&DataSourceProperties, &mut DynamicValue) -> Option<()>,
}

pub static WINDOWS_EVENT: DataSourceKind = DataSourceKind {
    type_name: "azurerm_log_analytics_datasource_windows_event",
    api_kind: "WindowsEvent",
    description: "Collects Windows event log entries into a Log Analytics workspace",
    attributes: windows_event::attributes,
    check: windows_event::check,
    expand: windows_event::expand,
    flatten: windows_event::flatten,
};

pub static WINDOWS_PERFORMANCE_COUNTER: DataSourceKind = DataSourceKind {
    type_name: "azurerm_log_analytics_datasource_windows_performance_counter",
    api_kind: "WindowsPerformanceCounter",
    description: "Collects a Windows performance counter into a Log Analytics workspace",
    attributes: performance_counter::attributes,
    check: performance_counter::check,
    expand: performance_counter::expand,
    flatten: performance_counter::flatten,
};

pub static DATA_SOURCE_KINDS: &[&DataSourceKind] = &[&WINDOWS_EVENT, &WINDOWS_PERFORMANCE_COUNTER];

/// Looks up a kind by Terraform type name
pub fn data_source_kind(type_name: &str) -> Option<&'static DataSourceKind> {
    DATA_SOURCE_KINDS
        .iter()
        .copied()
        .find(|kind| kind.type_name == type_name)
}

mod windows_event {
    use super::*;

    pub const EVENT_TYPES: [&str; 3] = ["Error", "Information", "Warning"];

    pub fn attributes() -> Vec<Attribute> {
        vec![
            AttributeBuilder::new("event_log_name", AttributeType::String)
                .description("Windows event log to collect from, e.g. Application")
                .required()
                .validator(Box::new(StringNotEmpty))
                .build(),
            AttributeBuilder::new("event_types", AttributeType::Set(Box::new(AttributeType::String)))
                .description("Severities to collect: Error, Information or Warning")
                .required()
                .build(),
        ]
    }

    fn canonical(value: &str) -> Option<&'static str> {
        EVENT_TYPES
            .iter()
            .copied()
            .find(|t| t.eq_ignore_ascii_case(value))
    }

    pub fn check(config: &DynamicValue) -> Vec<Diagnostic> {
        let path = AttributePath::new("event_types");
        if !config.is_set(&path) {
            return vec![];
        }
        let types = string_list(config, "event_types");
        if types.is_empty() {
            return vec![Diagnostic::error(
                "Invalid event_types",
                "At least one event type must be collected",
            )
            .with_attribute(path)];
        }
        types
            .iter()
            .enumerate()
            .filter(|(_, t)| canonical(t).is_none())
            .map(|(i, t)| {
                Diagnostic::error(
                    "Invalid event type",
                    format!("{:?} must be one of {}", t, EVENT_TYPES.join(", ")),
                )
                .with_attribute(path.clone().index(i as i64))
            })
            .collect()
    }

    pub fn expand(config: &DynamicValue) -> Result<DataSourceProperties, Diagnostic> {
        let event_types = string_list(config, "event_types")
            .iter()
            .map(|t| WindowsEventType {
                event_type: canonical(t).unwrap_or(t.as_str()).to_string(),
            })
            .collect();
        Ok(DataSourceProperties::WindowsEvent(WindowsEventProperties {
            event_log_name: required_string(config, "event_log_name")?,
            event_types,
        }))
    }

    pub fn flatten(properties: &DataSourceProperties, state: &mut DynamicValue) -> Option<()> {
        let DataSourceProperties::WindowsEvent(props) = properties else {
            return None;
        };
        put_string(state, "event_log_name", Some(props.event_log_name.clone()));
        put_string_list(
            state,
            "event_types",
            props
                .event_types
                .iter()
                .map(|t| {
                    canonical(&t.event_type)
                        .unwrap_or(t.event_type.as_str())
                        .to_string()
                })
                .collect(),
        );
        Some(())
    }
}

mod performance_counter {
    use super::*;

    pub fn attributes() -> Vec<Attribute> {
        let required = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .validator(Box::new(StringNotEmpty))
                .build()
        };
        vec![
            required("object_name", "Performance object, e.g. Processor"),
            required("instance_name", "Object instance, or * for all"),
            required("counter_name", "Counter within the object"),
            AttributeBuilder::new("interval_seconds", AttributeType::Number)
                .description("Sampling interval in seconds")
                .required()
                .validator(Box::new(IntBetween::new(10, i64::from(i32::MAX))))
                .build(),
        ]
    }

    pub fn check(_config: &DynamicValue) -> Vec<Diagnostic> {
        vec![]
    }

    pub fn expand(config: &DynamicValue) -> Result<DataSourceProperties, Diagnostic> {
        let interval_seconds = config
            .get_i64(&AttributePath::new("interval_seconds"))
            .map_err(|_| {
                Diagnostic::error("Missing interval_seconds", "interval_seconds is required")
                    .with_attribute(AttributePath::new("interval_seconds"))
            })?;
        Ok(DataSourceProperties::WindowsPerformanceCounter(
            WindowsPerformanceCounterProperties {
                object_name: required_string(config, "object_name")?,
                instance_name: required_string(config, "instance_name")?,
                counter_name: required_string(config, "counter_name")?,
                interval_seconds,
            },
        ))
    }

    pub fn flatten(properties: &DataSourceProperties, state: &mut DynamicValue) -> Option<()> {
        let DataSourceProperties::WindowsPerformanceCounter(props) = properties else {
            return None;
        };
        put_string(state, "object_name", Some(props.object_name.clone()));
        put_string(state, "instance_name", Some(props.instance_name.clone()));
        put_string(state, "counter_name", Some(props.counter_name.clone()));
        put_i64(state, "interval_seconds", Some(props.interval_seconds));
        Some(())
    }
}

pub struct DataSourceResource {
    kind: &'static DataSourceKind,
    client: Option<DataSourcesClient>,
    subscription_id: String,
}

impl DataSourceResource {
    pub fn new(kind: &'static DataSourceKind) -> Self {
        Self {
            kind,
            client: None,
            subscription_id: String::new(),
        }
    }

    pub fn with_client(
        kind: &'static DataSourceKind,
        subscription_id: impl Into<String>,
        client: DataSourcesClient,
    ) -> Self {
        Self {
            kind,
            client: Some(client),
            subscription_id: subscription_id.into(),
        }
    }

    fn client(&self) -> Result<&DataSourcesClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition(&self) -> Schema {
        let builder = SchemaBuilder::new()
            .version(0)
            .description(self.kind.description)
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the data source")
                    .required()
                    .validator(Box::new(StringNotEmpty))
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(resource_group_name_attribute())
            .attribute(
                AttributeBuilder::new("workspace_name", AttributeType::String)
                    .description("Name of the Log Analytics workspace")
                    .required()
                    .validator(validate::workspace_name())
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            );
        (self.kind.attributes)()
            .into_iter()
            .fold(builder, |builder, attribute| builder.attribute(attribute))
            .build()
    }

    fn config_id(&self, config: &DynamicValue) -> Result<LogAnalyticsDataSourceId, Diagnostic> {
        Ok(LogAnalyticsDataSourceId::new(
            &self.subscription_id,
            required_string(config, "resource_group_name")?,
            required_string(config, "workspace_name")?,
            required_string(config, "name")?,
        ))
    }

    fn flatten(
        &self,
        id: &LogAnalyticsDataSourceId,
        source: &DataSource,
    ) -> Result<DynamicValue, Diagnostic> {
        let mut state = DynamicValue::object();
        put_string(&mut state, "id", Some(id.to_string()));
        put_string(&mut state, "name", Some(id.name.clone()));
        put_string(&mut state, "resource_group_name", Some(id.resource_group.clone()));
        put_string(&mut state, "workspace_name", Some(id.workspace_name.clone()));
        (self.kind.flatten)(&source.properties, &mut state).ok_or_else(|| {
            Diagnostic::error(
                "Unexpected data source kind",
                format!(
                    "{} is a {} data source, expected {}",
                    id.describe(),
                    source.properties.kind(),
                    self.kind.api_kind
                ),
            )
        })?;
        Ok(state)
    }

    async fn write(&self, config: &DynamicValue, creating: bool) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let id = self.config_id(config)?;
        if creating {
            require_absent(client.get(&id).await, self.kind.type_name, &id.id())?;
        }

        let body = DataSource {
            id: None,
            name: None,
            etag: None,
            properties: (self.kind.expand)(config)?,
        };
        client
            .create_or_update(&id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to write {}", id.describe()), &e))?;

        let source = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        self.flatten(&id, &source)
    }
}

#[async_trait]
impl Resource for DataSourceResource {
    fn type_name(&self) -> &str {
        self.kind.type_name
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
            schema: self.schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = self.schema_definition().validate_config(&request.config);
        diagnostics.extend((self.kind.check)(&request.config));
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
        let id = match state_id(&request.current_state, self.kind.type_name)
            .and_then(|raw| parse_id(LogAnalyticsDataSourceId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(source) => match self.flatten(&id, &source) {
                Ok(state) => ReadResourceResponse::found(state),
                Err(diag) => ReadResourceResponse::failed(request.current_state, diag),
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
            state_id(&request.prior_state, self.kind.type_name)
                .and_then(|raw| parse_id(LogAnalyticsDataSourceId::parse, &raw)),
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
impl ResourceWithConfigure for DataSourceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.client = Some(data.clients.log_analytics.data_sources.clone());
                self.subscription_id = data.clients.subscription_id.clone();
            }
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for DataSourceResource {
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
            LogAnalyticsDataSourceId::parse,
        );
        response
    }
}
