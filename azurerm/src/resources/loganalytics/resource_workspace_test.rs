#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::provider_data::AzureRmProviderData;
    use crate::resources::test_support::{json, test_clients, SUBSCRIPTION};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    fn path() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/acctest-ws1",
            SUBSCRIPTION
        )
    }

    fn config() -> DynamicValue {
        json(json!({
            "name": "acctest-ws1",
            "resource_group_name": "rg1",
            "location": "West Europe",
            "sku": "PerGB2018",
            "retention_in_days": 30,
            "tags": {"env": "test"}
        }))
    }

    fn remote_body(sku: &str) -> String {
        json!({
            "id": path(),
            "name": "acctest-ws1",
            "location": "westeurope",
            "tags": {"env": "test"},
            "properties": {
                "provisioningState": "Succeeded",
                "customerId": "11111111-1111-1111-1111-111111111111",
                "sku": {"name": sku},
                "retentionInDays": 30,
                "workspaceCapping": {"dailyQuotaGb": -1.0},
                "publicNetworkAccessForIngestion": "Enabled",
                "publicNetworkAccessForQuery": "Disabled"
            }
        })
        .to_string()
    }

    fn resource(url: &str) -> WorkspaceResource {
        let clients = test_clients(url);
        WorkspaceResource::with_client(SUBSCRIPTION, clients.log_analytics.workspaces)
    }

    fn validate_request(config: DynamicValue) -> ValidateResourceConfigRequest {
        ValidateResourceConfigRequest {
            type_name: TYPE_NAME.to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn create_request() -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: TYPE_NAME.to_string(),
            planned_state: config(),
            config: config(),
            planned_private: vec![],
            provider_meta: None,
        }
    }

    fn state_with_id() -> DynamicValue {
        json(json!({"id": path(), "location": "West Europe"}))
    }

    #[test]
    fn test_resource_type_name() {
        assert_eq!(WorkspaceResource::new().type_name(), TYPE_NAME);
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let response = WorkspaceResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await;
        let schema = response.schema;

        assert!(schema.attribute("name").unwrap().required);
        assert!(schema.attribute("resource_group_name").unwrap().required);
        assert!(schema.attribute("workspace_id").unwrap().computed);
        assert!(schema.attribute("primary_shared_key").unwrap().sensitive);
        assert!(schema.attribute("secondary_shared_key").unwrap().sensitive);
    }

    #[tokio::test]
    async fn test_validate_valid_config() {
        let response = WorkspaceResource::new()
            .validate(Context::new(), validate_request(config()))
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_name() {
        let response = WorkspaceResource::new()
            .validate(
                Context::new(),
                validate_request(json(json!({
                    "name": "-ws",
                    "resource_group_name": "rg1",
                    "location": "westeurope"
                }))),
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_free_sku_retention() {
        let response = WorkspaceResource::new()
            .validate(
                Context::new(),
                validate_request(json(json!({
                    "name": "acctest-ws1",
                    "resource_group_name": "rg1",
                    "location": "westeurope",
                    "sku": "Free",
                    "retention_in_days": 30
                }))),
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("must be 7"));
    }

    #[tokio::test]
    async fn test_validate_reservation_requires_capacity_sku() {
        let response = WorkspaceResource::new()
            .validate(
                Context::new(),
                validate_request(json(json!({
                    "name": "acctest-ws1",
                    "resource_group_name": "rg1",
                    "location": "westeurope",
                    "sku": "PerGB2018",
                    "reservation_capacity_in_gb_per_day": 100
                }))),
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("CapacityReservation"));

        let response = WorkspaceResource::new()
            .validate(
                Context::new(),
                validate_request(json(json!({
                    "name": "acctest-ws1",
                    "resource_group_name": "rg1",
                    "location": "westeurope",
                    "sku": "CapacityReservation"
                }))),
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Missing"));
    }

    #[test]
    fn test_expand_sets_capacity_only_for_capacity_sku() {
        let cfg = WorkspaceResource::with_client(
            SUBSCRIPTION,
            test_clients("http://localhost").log_analytics.workspaces,
        )
        .extract_config(&json(json!({
            "name": "acctest-ws1",
            "resource_group_name": "rg1",
            "location": "westeurope",
            "sku": "capacityreservation",
            "reservation_capacity_in_gb_per_day": 200,
            "internet_query_enabled": false
        })))
        .unwrap();
        let body = cfg.expand();
        let props = body.properties.unwrap();

        assert_eq!(props.sku.unwrap().capacity_reservation_level, Some(200));
        assert_eq!(props.workspace_capping.unwrap().daily_quota_gb, -1.0);
        assert_eq!(
            props.public_network_access_for_query,
            Some(EnabledState::Disabled)
        );
        assert_eq!(
            props.public_network_access_for_ingestion,
            Some(EnabledState::Enabled)
        );
    }

    #[tokio::test]
    async fn test_create_without_provider_data() {
        let response = WorkspaceResource::new()
            .create(Context::new(), create_request())
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
        assert!(response.new_state.is_null());
    }

    #[tokio::test]
    async fn test_create_success() {
        let mut server = Server::new_async().await;
        let absent = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"ResourceNotFound","message":"not found"}}"#)
            .expect(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", path().as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "location": "West Europe",
                "properties": {"sku": {"name": "PerGB2018"}, "retentionInDays": 30}
            })))
            .with_status(200)
            .with_body(remote_body("PerGB2018"))
            .create_async()
            .await;
        let _present = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body("pergb2018"))
            .expect_at_least(1)
            .create_async()
            .await;
        let _keys = server
            .mock("POST", format!("{}/sharedKeys", path()).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"primarySharedKey":"pk","secondarySharedKey":"sk"}"#)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(Context::new(), create_request())
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        absent.assert_async().await;
        put.assert_async().await;

        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path());
        assert_eq!(state.get_string(&AttributePath::new("sku")).unwrap(), "PerGB2018");
        assert_eq!(
            state.get_string(&AttributePath::new("location")).unwrap(),
            "West Europe"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("workspace_id")).unwrap(),
            "11111111-1111-1111-1111-111111111111"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("primary_shared_key")).unwrap(),
            "pk"
        );
        assert!(!state
            .get_bool(&AttributePath::new("internet_query_enabled"))
            .unwrap());
        assert!(state
            .get_bool(&AttributePath::new("internet_ingestion_enabled"))
            .unwrap());
        assert_eq!(
            state.get_number(&AttributePath::new("daily_quota_gb")).unwrap(),
            -1.0
        );
    }

    #[tokio::test]
    async fn test_create_existing_requires_import() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body("PerGB2018"))
            .create_async()
            .await;
        let put = server
            .mock("PUT", path().as_str())
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(Context::new(), create_request())
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Resource already exists");
        assert!(response.diagnostics[0].detail.contains(&path()));
        assert!(response.diagnostics[0].detail.contains(TYPE_NAME));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_reports_failed_provisioning() {
        let mut server = Server::new_async().await;
        let _absent = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let _put = server
            .mock("PUT", path().as_str())
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body("")
            .create_async()
            .await;
        let _failed = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body("PerGB2018").replace("Succeeded", "Failed"))
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(Context::new(), create_request())
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("\"Failed\""));
        assert!(response.diagnostics[0].detail.contains("acctest-ws1"));
    }

    #[tokio::test]
    async fn test_read_removes_missing_workspace() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: state_with_id(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_read_keeps_state_on_api_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":"BadRequest","message":"nope"}}"#)
            .create_async()
            .await;

        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: state_with_id(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.new_state, Some(state_with_id()));
    }

    #[tokio::test]
    async fn test_read_survives_shared_key_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body("PerGB2018"))
            .create_async()
            .await;
        let _keys = server
            .mock("POST", format!("{}/sharedKeys", path()).as_str())
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: state_with_id(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                    current_identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state.unwrap();
        assert!(state
            .get_value(&AttributePath::new("primary_shared_key"))
            .unwrap()
            .is_null());
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "acctest-ws1");
    }

    #[tokio::test]
    async fn test_delete_polls_until_gone() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", path().as_str())
            .match_query(Matcher::UrlEncoded("force".into(), "false".into()))
            .with_status(200)
            .create_async()
            .await;
        let gone = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let response = resource(&server.url())
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: state_with_id(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        delete.assert_async().await;
        gone.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_validates_id() {
        let resource = WorkspaceResource::new();
        let ok = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: path(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;
        assert!(ok.diagnostics.is_empty());
        assert_eq!(ok.imported_resources.len(), 1);

        let wrong_case = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: path().replace("/workspaces/", "/Workspaces/"),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;
        assert_eq!(wrong_case.diagnostics.len(), 1);
        assert!(wrong_case.imported_resources.is_empty());
    }

    #[tokio::test]
    async fn test_configure_takes_workspace_client() {
        let mut resource = WorkspaceResource::new();
        let data = AzureRmProviderData::new(test_clients("http://localhost"));
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(data)),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(resource.client.is_some());
        assert_eq!(resource.subscription_id, SUBSCRIPTION);
    }
}
