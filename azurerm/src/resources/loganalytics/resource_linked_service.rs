//! Log Analytics linked service resource
//!
//! A workspace links to at most one automation account (read access, named
//! `Automation`) and one cluster (write access, named `Cluster`).

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
use tfplug::schema::{
    AttributeBuilder, AttributeType, PlanModifier, PlanModifierRequest, PlanModifierResponse,
    Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use super::{provisioning, workspace_id_attribute};
use crate::api::loganalytics::linked_services::{LinkedService, LinkedServiceProperties};
use crate::api::loganalytics::LinkedServicesClient;
use crate::ids::{
    AutomationAccountId, LogAnalyticsClusterId, LogAnalyticsLinkedServiceId,
    LogAnalyticsWorkspaceId, ResourceId,
};
use crate::poll::{Refreshed, StateWaiter};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, not_configured, optional_string, parse_id, put_string, read_within,
    require_absent, required_string, state_id, wait_error, wait_for_deletion, Timeouts,
    POLL_INTERVAL,
};
use crate::validate;

const TYPE_NAME: &str = "azurerm_log_analytics_linked_service";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

const AUTOMATION: &str = "Automation";
const CLUSTER: &str = "Cluster";

#[derive(Default)]
pub struct LinkedServiceResource {
    client: Option<LinkedServicesClient>,
}

#[derive(Debug, Clone, PartialEq)]
enum Access {
    Read(String),
    Write(String),
}

impl Access {
    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        match (
            optional_string(config, "read_access_id"),
            optional_string(config, "write_access_id"),
        ) {
            (Some(read), None) => Ok(Self::Read(read)),
            (None, Some(write)) => Ok(Self::Write(write)),
            _ => Err(Diagnostic::error(
                "Invalid linked service",
                "Exactly one of read_access_id or write_access_id must be set",
            )),
        }
    }

    fn service_name(&self) -> &'static str {
        match self {
            Self::Read(_) => AUTOMATION,
            Self::Write(_) => CLUSTER,
        }
    }

    fn properties(&self) -> LinkedServiceProperties {
        match self {
            Self::Read(id) => LinkedServiceProperties {
                resource_id: Some(id.clone()),
                ..Default::default()
            },
            Self::Write(id) => LinkedServiceProperties {
                write_access_resource_id: Some(id.clone()),
                ..Default::default()
            },
        }
    }
}

/// Replaces the link when an access ID changes, including when it is
/// removed. Moving between read and write access renames the link, so an
/// in-place PUT would leave the old one behind.
struct AccessRequiresReplace;

impl PlanModifier for AccessRequiresReplace {
    fn description(&self) -> String {
        "changing or removing this access ID forces a new linked service".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let state = &request.state_value.value;
        let requires_replace = !state.is_null() && *state != request.plan_value.value;
        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

impl LinkedServiceResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: LinkedServicesClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&LinkedServicesClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Links an automation account or cluster to a Log Analytics workspace")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Derived from the access kind: Automation or Cluster")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(workspace_id_attribute("workspace_id"))
            .attribute(
                AttributeBuilder::new("read_access_id", AttributeType::String)
                    .description("Automation account granted read access")
                    .optional()
                    .validator(validate::resource_id::<AutomationAccountId>())
                    .plan_modifier(Box::new(AccessRequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("write_access_id", AttributeType::String)
                    .description("Cluster granted write access")
                    .optional()
                    .validator(validate::resource_id::<LogAnalyticsClusterId>())
                    .plan_modifier(Box::new(AccessRequiresReplace))
                    .build(),
            )
            .build()
    }

    fn extract_config(
        config: &DynamicValue,
    ) -> Result<(LogAnalyticsLinkedServiceId, LinkedService), Diagnostic> {
        let workspace = parse_id(
            LogAnalyticsWorkspaceId::parse,
            &required_string(config, "workspace_id")?,
        )?;
        let access = Access::from_config(config)?;
        let id = workspace.linked_service(access.service_name());
        let body = LinkedService {
            properties: Some(access.properties()),
            ..Default::default()
        };
        Ok((id, body))
    }

    async fn write(
        &self,
        ctx: &Context,
        config: &DynamicValue,
        creating: bool,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let (id, body) = Self::extract_config(config)?;
        let id = &id;
        if creating {
            require_absent(client.get(id).await, TYPE_NAME, &id.id())?;
        }

        client
            .create_or_update(id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to write {}", id.describe()), &e))?;

        let timeout = if creating {
            TIMEOUTS.create
        } else {
            TIMEOUTS.update
        };
        StateWaiter::new(id.describe(), timeout)
            .min_interval(POLL_INTERVAL)
            .wait(ctx, &provisioning(), move || async move {
                // older API versions omit the state once the link settles
                Refreshed::from_lookup(client.get(id).await, |s| {
                    s.provisioning_state().or(Some("Succeeded"))
                })
            })
            .await
            .map_err(|e| wait_error("Linked service did not finish provisioning", &e))?;

        let service = client
            .get(id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        Ok(flatten(id, &service))
    }
}

fn flatten(id: &LogAnalyticsLinkedServiceId, service: &LinkedService) -> DynamicValue {
    let props = service.properties.clone().unwrap_or_default();
    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(&mut state, "workspace_id", Some(id.workspace_id().to_string()));
    put_string(&mut state, "read_access_id", props.resource_id);
    put_string(&mut state, "write_access_id", props.write_access_resource_id);
    state
}

#[async_trait]
impl Resource for LinkedServiceResource {
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
        let pending = ["read_access_id", "write_access_id"].iter().any(|name| {
            config
                .get_value(&AttributePath::new(name))
                .is_some_and(|v| v.is_unknown())
        });
        if !pending {
            if let Err(diag) = Access::from_config(config) {
                diagnostics.push(diag);
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.write(&ctx, &request.config, true).await {
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
            .and_then(|raw| parse_id(LogAnalyticsLinkedServiceId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(service) => ReadResourceResponse::found(flatten(&id, &service)),
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
        match self.write(&ctx, &request.config, false).await {
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
                .and_then(|raw| parse_id(LogAnalyticsLinkedServiceId::parse, &raw)),
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
impl ResourceWithConfigure for LinkedServiceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => self.client = Some(data.clients.log_analytics.linked_services.clone()),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for LinkedServiceResource {
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
            LogAnalyticsLinkedServiceId::parse,
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

    fn cluster() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.OperationalInsights/clusters/c1",
            SUBSCRIPTION
        )
    }

    fn automation() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Automation/automationAccounts/auto1",
            SUBSCRIPTION
        )
    }

    async fn validate(config: DynamicValue) -> Vec<Diagnostic> {
        LinkedServiceResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await
            .diagnostics
    }

    #[test]
    fn access_derives_service_name() {
        let read = json(json!({"workspace_id": workspace(), "read_access_id": automation()}));
        let write = json(json!({"workspace_id": workspace(), "write_access_id": cluster()}));
        assert_eq!(Access::from_config(&read).unwrap().service_name(), "Automation");
        assert_eq!(Access::from_config(&write).unwrap().service_name(), "Cluster");
    }

    #[test]
    fn switching_access_kind_replaces_the_link() {
        let schema = LinkedServiceResource::schema_definition();
        let prior = json(json!({
            "id": format!("{}/linkedServices/Automation", workspace()),
            "name": "Automation",
            "workspace_id": workspace(),
            "read_access_id": automation()
        }));

        let to_write = json(json!({"workspace_id": workspace(), "write_access_id": cluster()}));
        let change = schema.plan_change(&prior, &to_write, &to_write);
        assert_eq!(
            change.requires_replace,
            vec![AttributePath::new("read_access_id")]
        );

        let unchanged = json(json!({"workspace_id": workspace(), "read_access_id": automation()}));
        let change = schema.plan_change(&prior, &unchanged, &unchanged);
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn creating_a_link_never_replaces() {
        let schema = LinkedServiceResource::schema_definition();
        let config = json(json!({"workspace_id": workspace(), "write_access_id": cluster()}));
        let change = schema.plan_change(&DynamicValue::null(), &config, &config);
        assert!(change.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn validate_requires_exactly_one_access_id() {
        let neither = validate(json(json!({"workspace_id": workspace()}))).await;
        assert_eq!(neither.len(), 1);

        let both = validate(json(json!({
            "workspace_id": workspace(),
            "read_access_id": automation(),
            "write_access_id": cluster()
        })))
        .await;
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].summary, "Invalid linked service");

        let one = validate(json(json!({"workspace_id": workspace(), "write_access_id": cluster()}))).await;
        assert!(one.is_empty(), "{:?}", one);
    }

    #[tokio::test]
    async fn create_cluster_link_polls_until_succeeded() {
        let path = format!("{}/linkedServices/Cluster", workspace());
        let body = |state: &str| {
            json!({
                "id": path,
                "name": "ws1/Cluster",
                "properties": {"writeAccessResourceId": cluster(), "provisioningState": state}
            })
            .to_string()
        };

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
                "properties": {"writeAccessResourceId": cluster()}
            })))
            .with_status(200)
            .with_body(body("ProvisioningAccount"))
            .create_async()
            .await;
        let _present = server
            .mock("GET", path.as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body("Succeeded"))
            .create_async()
            .await;

        let config = json(json!({"workspace_id": workspace(), "write_access_id": cluster()}));
        let response = LinkedServiceResource::with_client(
            test_clients(&server.url()).log_analytics.linked_services,
        )
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: config.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "Cluster");
        assert_eq!(
            state.get_string(&AttributePath::new("write_access_id")).unwrap(),
            cluster()
        );
        assert!(!state.is_set(&AttributePath::new("read_access_id")));
    }

    #[tokio::test]
    async fn create_rejects_existing_link() {
        let path = format!("{}/linkedServices/Automation", workspace());
        let mut server = Server::new_async().await;
        let _present = server
            .mock("GET", path.as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"id": path, "properties": {"resourceId": automation()}}).to_string())
            .create_async()
            .await;
        let put = server
            .mock("PUT", path.as_str())
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = json(json!({"workspace_id": workspace(), "read_access_id": automation()}));
        let response = LinkedServiceResource::with_client(
            test_clients(&server.url()).log_analytics.linked_services,
        )
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: config.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

        put.assert_async().await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Resource already exists");
    }
}
