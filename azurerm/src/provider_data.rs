//! Provider data structure passed to resources and data sources

use crate::api::Clients;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct AzureRmProviderData {
    pub clients: Arc<Clients>,
}

impl AzureRmProviderData {
    pub fn new(clients: Clients) -> Self {
        Self {
            clients: Arc::new(clients),
        }
    }

    /// Recover the provider data handed to `configure`
    pub fn from_any(provider_data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Self, Diagnostic> {
        let data = provider_data.ok_or_else(|| {
            Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )
        })?;
        data.downcast_ref::<AzureRmProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract AzureRmProviderData from provider data",
                )
            })
    }
}
