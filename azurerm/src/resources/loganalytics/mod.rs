//! Log Analytics resources

pub mod resource_cluster;
pub mod resource_cluster_customer_managed_key;
pub mod resource_data_export;
pub mod resource_datasource;
pub mod resource_linked_service;
pub mod resource_linked_storage_account;
pub mod resource_saved_search;
pub mod resource_storage_insights;
pub mod resource_workspace;

pub use resource_cluster::ClusterResource;
pub use resource_cluster_customer_managed_key::ClusterCustomerManagedKeyResource;
pub use resource_data_export::DataExportResource;
pub use resource_datasource::{
    DataSourceKind, DataSourceResource, DATA_SOURCE_KINDS, WINDOWS_EVENT,
    WINDOWS_PERFORMANCE_COUNTER,
};
pub use resource_linked_service::LinkedServiceResource;
pub use resource_linked_storage_account::LinkedStorageAccountResource;
pub use resource_saved_search::SavedSearchResource;
pub use resource_storage_insights::StorageInsightsResource;
pub use resource_workspace::WorkspaceResource;

use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};

use crate::ids::LogAnalyticsWorkspaceId;
use crate::poll::Transitions;
use crate::validate;

/// Provisioning states shared by the Operational Insights resource provider
pub(crate) fn provisioning() -> Transitions {
    Transitions::new(
        &["Creating", "Updating", "ProvisioningAccount", "Accepted"],
        &["Succeeded"],
    )
    .failed(&["Failed", "Canceled"])
}

/// `workspace_id` / `workspace_resource_id` attribute of child resources
pub(crate) fn workspace_id_attribute(name: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description("The ID of the Log Analytics Workspace")
        .required()
        .validator(validate::resource_id::<LogAnalyticsWorkspaceId>())
        .plan_modifier(Box::new(RequiresReplace))
        .build()
}
