//! Microsoft.Compute clients

pub mod disks;

use super::Client;

pub use disks::DisksClient;

#[derive(Clone)]
pub struct ComputeClients {
    pub disks: DisksClient,
}

impl ComputeClients {
    pub fn new(client: &Client) -> Self {
        Self {
            disks: DisksClient::new(client.clone()),
        }
    }
}
