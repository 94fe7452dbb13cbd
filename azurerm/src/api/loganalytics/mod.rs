//! Microsoft.OperationalInsights clients

pub mod clusters;
pub mod data_exports;
pub mod data_sources;
pub mod linked_services;
pub mod linked_storage_accounts;
pub mod saved_searches;
pub mod storage_insights;
pub mod workspaces;

use super::Client;

pub use clusters::ClustersClient;
pub use data_exports::DataExportsClient;
pub use data_sources::DataSourcesClient;
pub use linked_services::LinkedServicesClient;
pub use linked_storage_accounts::LinkedStorageAccountsClient;
pub use saved_searches::SavedSearchesClient;
pub use storage_insights::StorageInsightsClient;
pub use workspaces::WorkspacesClient;

#[derive(Clone)]
pub struct LogAnalyticsClients {
    pub clusters: ClustersClient,
    pub data_exports: DataExportsClient,
    pub data_sources: DataSourcesClient,
    pub linked_services: LinkedServicesClient,
    pub linked_storage_accounts: LinkedStorageAccountsClient,
    pub saved_searches: SavedSearchesClient,
    pub storage_insights: StorageInsightsClient,
    pub workspaces: WorkspacesClient,
}

impl LogAnalyticsClients {
    pub fn new(client: &Client) -> Self {
        Self {
            clusters: ClustersClient::new(client.clone()),
            data_exports: DataExportsClient::new(client.clone()),
            data_sources: DataSourcesClient::new(client.clone()),
            linked_services: LinkedServicesClient::new(client.clone()),
            linked_storage_accounts: LinkedStorageAccountsClient::new(client.clone()),
            saved_searches: SavedSearchesClient::new(client.clone()),
            storage_insights: StorageInsightsClient::new(client.clone()),
            workspaces: WorkspacesClient::new(client.clone()),
        }
    }
}
