use super::{provider, resource_id, Segment, RESOURCE_GROUP, SUBSCRIPTION};

const OPERATIONAL_INSIGHTS: Segment = provider("Microsoft.OperationalInsights");
const WORKSPACE: Segment = Segment::captured("workspaces", "workspaceName");

resource_id!(
    LogAnalyticsWorkspaceId, "Log Analytics Workspace",
    segments: [SUBSCRIPTION, RESOURCE_GROUP, OPERATIONAL_INSIGHTS, WORKSPACE],
    fields: [subscription_id, resource_group, name],
);

resource_id!(
    LogAnalyticsClusterId, "Log Analytics Cluster",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        Segment::captured("clusters", "clusterName"),
    ],
    fields: [subscription_id, resource_group, name],
);

resource_id!(
    /// The Data Export API returns `dataexports` in some responses
    LogAnalyticsDataExportId, "Log Analytics Data Export Rule",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("dataExports", "dataExportName").or_key(&["dataexports"]),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

resource_id!(
    /// The Storage Insights API returns `storageinsightconfigs` in some responses
    LogAnalyticsStorageInsightsId, "Log Analytics Storage Insights",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("storageInsightConfigs", "storageInsightConfigName")
            .or_key(&["storageinsightconfigs"]),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

resource_id!(
    /// Named by data source type; `linkedstorageaccounts` is returned by the API
    LogAnalyticsLinkedStorageAccountId, "Log Analytics Linked Storage Account",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("linkedStorageAccounts", "dataSourceType")
            .or_key(&["linkedstorageaccounts"]),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

resource_id!(
    LogAnalyticsLinkedServiceId, "Log Analytics Linked Service",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("linkedServices", "linkedServiceName"),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

resource_id!(
    LogAnalyticsSavedSearchId, "Log Analytics Saved Search",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("savedSearches", "savedSearchName"),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

resource_id!(
    LogAnalyticsDataSourceId, "Log Analytics Data Source",
    segments: [
        SUBSCRIPTION,
        RESOURCE_GROUP,
        OPERATIONAL_INSIGHTS,
        WORKSPACE,
        Segment::captured("dataSources", "dataSourceName"),
    ],
    fields: [subscription_id, resource_group, workspace_name, name],
);

impl LogAnalyticsWorkspaceId {
    /// Build the ID of a child resource under this workspace
    pub fn data_export(&self, name: impl Into<String>) -> LogAnalyticsDataExportId {
        LogAnalyticsDataExportId::new(&self.subscription_id, &self.resource_group, &self.name, name)
    }

    pub fn storage_insights(&self, name: impl Into<String>) -> LogAnalyticsStorageInsightsId {
        LogAnalyticsStorageInsightsId::new(&self.subscription_id, &self.resource_group, &self.name, name)
    }

    pub fn linked_storage_account(
        &self,
        data_source_type: impl Into<String>,
    ) -> LogAnalyticsLinkedStorageAccountId {
        LogAnalyticsLinkedStorageAccountId::new(
            &self.subscription_id,
            &self.resource_group,
            &self.name,
            data_source_type,
        )
    }

    pub fn linked_service(&self, name: impl Into<String>) -> LogAnalyticsLinkedServiceId {
        LogAnalyticsLinkedServiceId::new(&self.subscription_id, &self.resource_group, &self.name, name)
    }

    pub fn saved_search(&self, name: impl Into<String>) -> LogAnalyticsSavedSearchId {
        LogAnalyticsSavedSearchId::new(&self.subscription_id, &self.resource_group, &self.name, name)
    }

    pub fn data_source(&self, name: impl Into<String>) -> LogAnalyticsDataSourceId {
        LogAnalyticsDataSourceId::new(&self.subscription_id, &self.resource_group, &self.name, name)
    }
}

macro_rules! parent_workspace {
    ($($name:ident),+) => {
        $(
            impl $name {
                pub fn workspace_id(&self) -> LogAnalyticsWorkspaceId {
                    LogAnalyticsWorkspaceId::new(
                        &self.subscription_id,
                        &self.resource_group,
                        &self.workspace_name,
                    )
                }
            }
        )+
    };
}

parent_workspace!(
    LogAnalyticsDataExportId,
    LogAnalyticsStorageInsightsId,
    LogAnalyticsLinkedStorageAccountId,
    LogAnalyticsLinkedServiceId,
    LogAnalyticsSavedSearchId,
    LogAnalyticsDataSourceId
);
