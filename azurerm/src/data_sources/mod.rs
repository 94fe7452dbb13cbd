//! Data sources
//!
//! Each data source reads an existing object by name and resource group and
//! reports it with the same attributes the matching resource stores.

pub mod data_source_managed_disk;
pub mod data_source_workspace;

pub use data_source_managed_disk::ManagedDiskDataSource;
pub use data_source_workspace::WorkspaceDataSource;

use std::collections::HashMap;

use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::DataSourceFactory;
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

use crate::resources::required_string;

pub type Constructor = fn() -> Box<dyn DataSourceWithConfigure>;

pub const DATA_SOURCES: &[(&str, Constructor)] = &[
    ("azurerm_log_analytics_workspace", || {
        Box::new(WorkspaceDataSource::new()) as Box<dyn DataSourceWithConfigure>
    }),
    ("azurerm_managed_disk", || {
        Box::new(ManagedDiskDataSource::new()) as Box<dyn DataSourceWithConfigure>
    }),
];

pub fn factories() -> HashMap<String, DataSourceFactory> {
    DATA_SOURCES
        .iter()
        .map(|(name, constructor)| {
            let constructor = *constructor;
            (name.to_string(), Box::new(constructor) as DataSourceFactory)
        })
        .collect()
}

const LOOKUP_KEYS: [&str; 2] = ["name", "resource_group_name"];

/// Turns a resource schema into its read-only counterpart: the lookup keys
/// stay required, everything else becomes computed.
pub(crate) fn lookup_schema(resource: Schema, description: &str) -> Schema {
    let attributes = resource.block.attributes.into_iter().map(|attr| {
        let builder = AttributeBuilder::new(&attr.name, attr.r#type.clone())
            .description(&attr.description);
        let builder = if LOOKUP_KEYS.contains(&attr.name.as_str()) {
            builder.required()
        } else {
            builder.computed()
        };
        if attr.sensitive {
            builder.sensitive().build()
        } else {
            builder.build()
        }
    });
    SchemaBuilder::new()
        .version(0)
        .description(description)
        .attributes(attributes)
        .build()
}

/// (resource group, name) from a data source config
pub(crate) fn lookup_keys(config: &DynamicValue) -> Result<(String, String), Diagnostic> {
    Ok((
        required_string(config, "resource_group_name")?,
        required_string(config, "name")?,
    ))
}
