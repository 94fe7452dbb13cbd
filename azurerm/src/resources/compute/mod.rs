//! Compute resources

pub mod resource_managed_disk;

pub use resource_managed_disk::ManagedDiskResource;
