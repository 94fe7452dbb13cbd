//! Log Analytics saved search resource. Every attribute forces replacement,
//! so there is no update path.

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
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder, Validator, ValidatorRequest,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringMatches, StringNotEmpty};

use super::workspace_id_attribute;
use crate::api::common::Tags;
use crate::api::loganalytics::saved_searches::{SavedSearch, SavedSearchProperties, SavedSearchTag};
use crate::api::loganalytics::SavedSearchesClient;
use crate::ids::{LogAnalyticsSavedSearchId, LogAnalyticsWorkspaceId, ResourceId};
use crate::provider_data::AzureRmProviderData;
use crate::resources::{
    api_error, id_attribute, not_configured, optional_string, parse_id, put_string,
    put_string_list, put_tags, read_within, require_absent, required_string, state_id, string_list,
    tags, wait_for_deletion, Timeouts,
};

const TYPE_NAME: &str = "azurerm_log_analytics_saved_search";
const TIMEOUTS: Timeouts = Timeouts::minutes(30, 5, 30, 30);

/// `name:type` or `name:type = default`
const FUNCTION_PARAMETER: &str = r"^[A-Za-z0-9!\-_.]+:[A-Za-z0-9!\-_.]+(\s*=\s*.+)?$";

#[derive(Default)]
pub struct SavedSearchResource {
    client: Option<SavedSearchesClient>,
}

fn force_new_string(name: &str, description: &str, required: bool) -> Attribute {
    let builder = AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .plan_modifier(Box::new(RequiresReplace));
    if required {
        builder.required().validator(Box::new(StringNotEmpty)).build()
    } else {
        builder.optional().build()
    }
}

impl SavedSearchResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: SavedSearchesClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&SavedSearchesClient, Diagnostic> {
        self.client.as_ref().ok_or_else(not_configured)
    }

    pub(crate) fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a saved search in a Log Analytics workspace")
            .attribute(id_attribute())
            .attribute(force_new_string("name", "Name of the saved search", true))
            .attribute(workspace_id_attribute("log_analytics_workspace_id"))
            .attribute(force_new_string("category", "Category shown in the portal", true))
            .attribute(force_new_string("display_name", "Name shown in the portal", true))
            .attribute(force_new_string("query", "The Kusto query", true))
            .attribute(force_new_string(
                "function_alias",
                "Alias under which the query is callable as a function",
                false,
            ))
            .attribute(
                AttributeBuilder::new(
                    "function_parameters",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Function parameters as name:type pairs")
                .optional()
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Tags stored on the saved search")
                    .optional()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .build()
    }

    fn extract_config(
        config: &DynamicValue,
    ) -> Result<(LogAnalyticsSavedSearchId, SavedSearch), Diagnostic> {
        let workspace = parse_id(
            LogAnalyticsWorkspaceId::parse,
            &required_string(config, "log_analytics_workspace_id")?,
        )?;
        let id = workspace.saved_search(required_string(config, "name")?);

        let parameters = string_list(config, "function_parameters");
        let body = SavedSearch {
            properties: SavedSearchProperties {
                category: required_string(config, "category")?,
                display_name: required_string(config, "display_name")?,
                query: required_string(config, "query")?,
                function_alias: optional_string(config, "function_alias"),
                function_parameters: (!parameters.is_empty()).then(|| parameters.join(", ")),
                tags: expand_tags(tags(config).unwrap_or_default()),
            },
            ..Default::default()
        };
        Ok((id, body))
    }

    async fn create_search(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let (id, body) = Self::extract_config(config)?;
        require_absent(client.get(&id).await, TYPE_NAME, &id.id())?;

        client
            .create_or_update(&id, &body)
            .await
            .map_err(|e| api_error(format!("Failed to create {}", id.describe()), &e))?;

        let search = client
            .get(&id)
            .await
            .map_err(|e| api_error(format!("Failed to read {}", id.describe()), &e))?;
        Ok(flatten(&id, &search))
    }
}

/// Sorted so repeated applies send identical bodies
fn expand_tags(tags: Tags) -> Vec<SavedSearchTag> {
    let mut tags: Vec<SavedSearchTag> = tags
        .into_iter()
        .map(|(name, value)| SavedSearchTag { name, value })
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    tags
}

fn flatten_tags(tags: &[SavedSearchTag]) -> Tags {
    tags.iter()
        .map(|t| (t.name.clone(), t.value.clone()))
        .collect()
}

fn split_parameters(joined: Option<&str>) -> Vec<String> {
    joined
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
        .unwrap_or_default()
}

fn flatten(id: &LogAnalyticsSavedSearchId, search: &SavedSearch) -> DynamicValue {
    let props = &search.properties;
    let mut state = DynamicValue::object();
    put_string(&mut state, "id", Some(id.to_string()));
    put_string(&mut state, "name", Some(id.name.clone()));
    put_string(
        &mut state,
        "log_analytics_workspace_id",
        Some(id.workspace_id().to_string()),
    );
    put_string(&mut state, "category", Some(props.category.clone()));
    put_string(&mut state, "display_name", Some(props.display_name.clone()));
    put_string(&mut state, "query", Some(props.query.clone()));
    put_string(
        &mut state,
        "function_alias",
        props.function_alias.clone().filter(|a| !a.is_empty()),
    );
    let parameters = split_parameters(props.function_parameters.as_deref());
    if parameters.is_empty() {
        let _ = state.set_null(&AttributePath::new("function_parameters"));
    } else {
        put_string_list(&mut state, "function_parameters", parameters);
    }
    put_tags(&mut state, Some(&flatten_tags(&props.tags)));
    state
}

#[async_trait]
impl Resource for SavedSearchResource {
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
        let matcher = StringMatches::new(
            FUNCTION_PARAMETER,
            "function parameters must be name:type pairs",
        );
        for (i, parameter) in string_list(&request.config, "function_parameters")
            .into_iter()
            .enumerate()
        {
            let response = matcher.validate(ValidatorRequest {
                config_value: DynamicValue::new(Dynamic::String(parameter)),
                path: AttributePath::new("function_parameters").index(i as i64),
            });
            diagnostics.extend(response.diagnostics);
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_search(&request.config).await {
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
            .and_then(|raw| parse_id(LogAnalyticsSavedSearchId::parse, &raw))
        {
            Ok(id) => id,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        match read_within(&ctx, TIMEOUTS.read, client.get(&id)).await {
            Ok(search) => ReadResourceResponse::found(flatten(&id, &search)),
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
        UpdateResourceResponse::failed(
            request.prior_state,
            Diagnostic::error(
                "Update not supported",
                "Every saved search attribute forces replacement",
            ),
        )
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result = match (
            self.client(),
            state_id(&request.prior_state, TYPE_NAME)
                .and_then(|raw| parse_id(LogAnalyticsSavedSearchId::parse, &raw)),
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
impl ResourceWithConfigure for SavedSearchResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AzureRmProviderData::from_any(request.provider_data) {
            Ok(data) => self.client = Some(data.clients.log_analytics.saved_searches.clone()),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for SavedSearchResource {
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
            LogAnalyticsSavedSearchId::parse,
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
        format!("{}/savedSearches/search1", workspace())
    }

    fn config() -> DynamicValue {
        json(json!({
            "name": "search1",
            "log_analytics_workspace_id": workspace(),
            "category": "General",
            "display_name": "Heartbeats",
            "query": "Heartbeat | take 10",
            "function_alias": "beats",
            "function_parameters": ["limit:int = 10", "computer:string"],
            "tags": {"team": "ops", "env": "test"}
        }))
    }

    #[test]
    fn tags_are_sorted_name_value_pairs() {
        let tags = expand_tags(Tags::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]));
        assert_eq!(tags[0].name, "a");
        assert_eq!(tags[1].value, "2");
    }

    #[test]
    fn parameters_split_on_commas() {
        assert_eq!(
            split_parameters(Some("limit:int = 10, computer:string")),
            vec!["limit:int = 10".to_string(), "computer:string".to_string()]
        );
        assert!(split_parameters(Some("")).is_empty());
        assert!(split_parameters(None).is_empty());
    }

    #[tokio::test]
    async fn validate_rejects_malformed_parameter() {
        let mut config = config();
        config
            .set_string_list(
                &AttributePath::new("function_parameters"),
                vec!["limit".to_string()],
            )
            .unwrap();
        let response = SavedSearchResource::new()
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
        assert!(response.diagnostics[0].detail.contains("name:type"));
    }

    #[tokio::test]
    async fn create_joins_parameters_and_reads_back() {
        let remote = json!({
            "id": path(),
            "name": "search1",
            "properties": {
                "category": "General",
                "displayName": "Heartbeats",
                "query": "Heartbeat | take 10",
                "functionAlias": "beats",
                "functionParameters": "limit:int = 10, computer:string",
                "tags": [{"name": "env", "value": "test"}, {"name": "team", "value": "ops"}]
            }
        })
        .to_string();

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
                "properties": {
                    "functionParameters": "limit:int = 10, computer:string",
                    "tags": [{"name": "env", "value": "test"}, {"name": "team", "value": "ops"}]
                }
            })))
            .with_status(200)
            .with_body(remote.clone())
            .create_async()
            .await;
        let _present = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote)
            .create_async()
            .await;

        let response = SavedSearchResource::with_client(
            test_clients(&server.url()).log_analytics.saved_searches,
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
        assert_eq!(
            state
                .get_string_list(&AttributePath::new("function_parameters"))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            state.get_string_map(&AttributePath::new("tags")).unwrap()["team"],
            "ops"
        );
    }

    #[tokio::test]
    async fn update_is_refused() {
        let response = SavedSearchResource::new()
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: config(),
                    planned_state: config(),
                    config: config(),
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
