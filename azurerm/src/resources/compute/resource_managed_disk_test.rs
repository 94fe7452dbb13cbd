#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_support::{json, test_clients, SUBSCRIPTION};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    fn path() -> String {
        format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Compute/disks/disk1",
            SUBSCRIPTION
        )
    }

    fn config(extra: serde_json::Value) -> DynamicValue {
        let mut base = json!({
            "name": "disk1",
            "resource_group_name": "rg1",
            "location": "West Europe",
            "storage_account_type": "Premium_LRS",
            "create_option": "Empty",
            "disk_size_gb": 64,
            "tags": {"env": "test"}
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        json(base)
    }

    fn remote_body(size: i64, state: &str) -> String {
        json!({
            "id": path(),
            "name": "disk1",
            "location": "westeurope",
            "tags": {"env": "test"},
            "sku": {"name": "Premium_LRS"},
            "properties": {
                "provisioningState": state,
                "creationData": {"createOption": "Empty"},
                "diskSizeGB": size,
                "tier": "P6",
                "networkAccessPolicy": "AllowAll",
                "publicNetworkAccess": "Enabled"
            }
        })
        .to_string()
    }

    fn resource(url: &str) -> ManagedDiskResource {
        let clients = test_clients(url);
        ManagedDiskResource::with_client(SUBSCRIPTION, clients.compute.disks)
    }

    fn summaries(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.summary.clone()).collect()
    }

    fn state_with_id(size: i64) -> DynamicValue {
        let mut state = config(json!({"disk_size_gb": size}));
        state.set_string(&AttributePath::new("id"), path()).unwrap();
        state
    }

    #[test]
    fn test_resource_type_name() {
        assert_eq!(ManagedDiskResource::new().type_name(), TYPE_NAME);
    }

    #[test]
    fn test_schema_marks_source_attributes_force_new() {
        let schema = ManagedDiskResource::schema_definition();
        for name in ["create_option", "source_uri", "source_resource_id", "zone"] {
            let attr = schema.attribute(name).unwrap();
            assert!(!attr.plan_modifiers.is_empty(), "{name} should force new");
        }
        assert!(schema.attribute("disk_size_gb").unwrap().computed);
    }

    #[test]
    fn test_plan_replaces_on_create_option_but_not_location_spelling() {
        let schema = ManagedDiskResource::schema_definition();
        let prior = state_with_id(64);

        let respelled = config(json!({"location": "westeurope"}));
        let change = schema.plan_change(&prior, &respelled, &respelled);
        assert!(change.requires_replace.is_empty());

        let copied = config(json!({"create_option": "Copy"}));
        let change = schema.plan_change(&prior, &copied, &copied);
        assert_eq!(change.requires_replace, vec![AttributePath::new("create_option")]);
    }

    #[test]
    fn test_import_requires_source() {
        let diagnostics = ManagedDiskResource::check(&config(json!({"create_option": "Import"})));
        assert_eq!(
            summaries(&diagnostics),
            vec!["Missing source_uri", "Missing storage_account_id"]
        );
    }

    #[test]
    fn test_copy_and_upload_require_their_inputs() {
        let copy = ManagedDiskResource::check(&config(json!({"create_option": "Copy"})));
        assert_eq!(summaries(&copy), vec!["Missing source_resource_id"]);

        let upload = ManagedDiskResource::check(&config(json!({"create_option": "Upload"})));
        assert_eq!(summaries(&upload), vec!["Missing upload_size_bytes"]);

        let image = ManagedDiskResource::check(&config(json!({
            "create_option": "FromImage",
            "gallery_image_reference_id": "/subscriptions/x/galleries/g/images/i/versions/1"
        })));
        assert!(image.is_empty());
    }

    #[test]
    fn test_unknown_source_is_not_reported() {
        let mut cfg = config(json!({"create_option": "Copy"}));
        if let tfplug::types::Dynamic::Map(map) = &mut cfg.value {
            map.insert(
                "source_resource_id".to_string(),
                tfplug::types::Dynamic::Unknown,
            );
        }
        assert!(ManagedDiskResource::check(&cfg).is_empty());
    }

    #[test]
    fn test_performance_settings_need_ultra_or_premium_v2() {
        let premium = ManagedDiskResource::check(&config(json!({"disk_iops_read_write": 3000})));
        assert_eq!(summaries(&premium), vec!["Unsupported performance settings"]);

        let ultra = ManagedDiskResource::check(&config(json!({
            "storage_account_type": "ultrassd_lrs",
            "disk_iops_read_write": 3000,
            "logical_sector_size": 4096
        })));
        assert!(ultra.is_empty());
    }

    #[test]
    fn test_tier_bursting_and_disk_access_rules() {
        let tier = ManagedDiskResource::check(&config(json!({
            "storage_account_type": "Standard_LRS",
            "tier": "P10"
        })));
        assert_eq!(summaries(&tier), vec!["Unsupported tier"]);

        let bursting = ManagedDiskResource::check(&config(json!({
            "on_demand_bursting_enabled": true
        })));
        assert_eq!(summaries(&bursting), vec!["Unsupported bursting"]);

        let access = ManagedDiskResource::check(&config(json!({
            "disk_access_id": "/subscriptions/x/resourceGroups/rg/providers/Microsoft.Compute/diskAccesses/a"
        })));
        assert_eq!(summaries(&access), vec!["Unsupported disk_access_id"]);
    }

    #[test]
    fn test_expand_defaults_network_settings() {
        let disk = ManagedDiskResource::expand(&config(json!({
            "storage_account_type": "premium_lrs",
            "zone": "2"
        })))
        .unwrap();
        assert_eq!(disk.sku.unwrap().name, "Premium_LRS");
        assert_eq!(disk.zones, Some(vec!["2".to_string()]));
        let props = disk.properties.unwrap();
        assert_eq!(props.network_access_policy.as_deref(), Some("AllowAll"));
        assert_eq!(props.public_network_access, Some(EnabledState::Enabled));
        assert_eq!(props.creation_data.create_option, "Empty");
        assert_eq!(props.disk_access_id, None);
    }

    #[test]
    fn test_update_rejects_shrink() {
        let err = ManagedDiskResource::expand_update(&state_with_id(128), &config(json!({})))
            .unwrap_err();
        assert_eq!(
            err.detail,
            "New size must be greater than original size. Shrinking disks is not supported on Azure"
        );
    }

    #[test]
    fn test_update_only_sends_changes() {
        let update = ManagedDiskResource::expand_update(
            &state_with_id(64),
            &config(json!({"disk_size_gb": 128, "storage_account_type": "Standard_LRS"})),
        )
        .unwrap();
        assert_eq!(update.properties.disk_size_gb, Some(128));
        assert_eq!(update.sku.unwrap().name, "Standard_LRS");
        assert_eq!(update.tags, None);
        assert_eq!(update.properties.tier, None);
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
                "sku": {"name": "Premium_LRS"},
                "properties": {
                    "creationData": {"createOption": "Empty"},
                    "diskSizeGB": 64,
                    "networkAccessPolicy": "AllowAll"
                }
            })))
            .with_status(202)
            .create_async()
            .await;
        let _present = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body(64, "Succeeded"))
            .expect_at_least(1)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: config(json!({})),
                    config: config(json!({})),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        absent.assert_async().await;
        put.assert_async().await;
        let state = &response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), path());
        assert_eq!(
            state.get_string(&AttributePath::new("location")).unwrap(),
            "West Europe"
        );
        assert_eq!(state.get_string(&AttributePath::new("tier")).unwrap(), "P6");
        assert!(state
            .get_bool(&AttributePath::new("public_network_access_enabled"))
            .unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_requires_import() {
        let mut server = Server::new_async().await;
        let _existing = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body(64, "Succeeded"))
            .create_async()
            .await;
        let put = server
            .mock("PUT", path().as_str())
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: config(json!({})),
                    config: config(json!({})),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Resource already exists");
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_grows_disk() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", path().as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "properties": {"diskSizeGB": 128}
            })))
            .with_status(202)
            .create_async()
            .await;
        let _get = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(remote_body(128, "Succeeded"))
            .create_async()
            .await;

        let response = resource(&server.url())
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: state_with_id(64),
                    planned_state: config(json!({"disk_size_gb": 128})),
                    config: config(json!({"disk_size_gb": 128})),
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        patch.assert_async().await;
        assert_eq!(
            response
                .new_state
                .get_i64(&AttributePath::new("disk_size_gb"))
                .unwrap(),
            128
        );
    }

    fn attached_body(disk_state: &str) -> serde_json::Value {
        let mut body: serde_json::Value = serde_json::from_str(&remote_body(64, "Succeeded")).unwrap();
        body["managedBy"] = json!(format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1",
            SUBSCRIPTION
        ));
        body["properties"]["diskState"] = json!(disk_state);
        body
    }

    fn attached_disk(disk_state: &str) -> Disk {
        serde_json::from_value(attached_body(disk_state)).unwrap()
    }

    #[test]
    fn test_offline_changes() {
        let prior = state_with_id(64);
        assert!(ManagedDiskResource::offline_changes(&prior, &config(json!({"disk_size_gb": 128}))).is_empty());
        assert_eq!(
            ManagedDiskResource::offline_changes(
                &prior,
                &config(json!({"storage_account_type": "standard_lrs", "tier": "P10"}))
            ),
            vec!["storage_account_type", "tier"]
        );
        // sku casing alone is not a change
        assert!(ManagedDiskResource::offline_changes(
            &prior,
            &config(json!({"storage_account_type": "premium_lrs"}))
        )
        .is_empty());

        assert!(ManagedDiskResource::grows_past_detach_boundary(
            &state_with_id(1024),
            &config(json!({"disk_size_gb": 4096}))
        ));
        assert!(!ManagedDiskResource::grows_past_detach_boundary(
            &state_with_id(4096),
            &config(json!({"disk_size_gb": 8192}))
        ));
    }

    #[test]
    fn test_check_attachment() {
        let id = ManagedDiskId::parse(&path()).unwrap();

        let running = attached_disk("Attached");
        let err = ManagedDiskResource::check_attachment(&id, &running, &["tier"], false).unwrap_err();
        assert_eq!(err.summary, "Managed disk is in use");
        assert!(err.detail.contains("vm1"));
        assert!(ManagedDiskResource::check_attachment(&id, &running, &[], false).is_ok());

        // a deallocated machine still holds the disk but allows offline changes
        let reserved = attached_disk("Reserved");
        assert!(ManagedDiskResource::check_attachment(&id, &reserved, &["tier"], false).is_ok());
        let err = ManagedDiskResource::check_attachment(&id, &reserved, &[], true).unwrap_err();
        assert_eq!(err.summary, "Managed disk must be detached");
    }

    #[tokio::test]
    async fn test_update_tier_refused_while_vm_running() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(attached_body("Attached").to_string())
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", path().as_str())
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = resource(&server.url())
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: state_with_id(64),
                    planned_state: config(json!({"tier": "P10"})),
                    config: config(json!({"tier": "P10"})),
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        patch.assert_async().await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Managed disk is in use");
        assert_eq!(
            response
                .new_state
                .get_i64(&AttributePath::new("disk_size_gb"))
                .unwrap(),
            64
        );
    }

    #[tokio::test]
    async fn test_update_shrink_keeps_prior_state() {
        let server = Server::new_async().await;
        let response = resource(&server.url())
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: state_with_id(128),
                    planned_state: config(json!({})),
                    config: config(json!({})),
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid disk_size_gb");
        assert_eq!(
            response
                .new_state
                .get_i64(&AttributePath::new("disk_size_gb"))
                .unwrap(),
            128
        );
    }

    #[tokio::test]
    async fn test_read_removes_missing_disk() {
        let mut server = Server::new_async().await;
        let _gone = server
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
                    current_state: state_with_id(64),
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
    async fn test_delete_polls_until_gone() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", path().as_str())
            .match_query(Matcher::Any)
            .with_status(202)
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
                    prior_state: state_with_id(64),
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
        let resource = ManagedDiskResource::new();
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

        let wrong = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: path().replace("/disks/", "/snapshots/"),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;
        assert!(!wrong.diagnostics.is_empty());
    }
}
