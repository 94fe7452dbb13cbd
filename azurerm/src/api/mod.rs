//! Azure Resource Manager API client
//!
//! [`Client`] handles authentication, retries and error mapping. The typed
//! clients under [`loganalytics`] and [`compute`] wrap it per resource type,
//! and [`Clients`] bundles them for the provider.

pub mod auth;
pub mod client;
pub mod common;
pub mod compute;
pub mod error;
pub mod loganalytics;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{ClientSecretCredential, Credential};
pub use client::{Client, RetryConfig};
pub use common::ApiQueryParams;
pub use error::ApiError;

use compute::ComputeClients;
use loganalytics::LogAnalyticsClients;

/// Every typed client the provider hands out
#[derive(Clone)]
pub struct Clients {
    pub subscription_id: String,
    pub log_analytics: LogAnalyticsClients,
    pub compute: ComputeClients,
}

impl Clients {
    pub fn new(subscription_id: impl Into<String>, client: Client) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            log_analytics: LogAnalyticsClients::new(&client),
            compute: ComputeClients::new(&client),
        }
    }
}
