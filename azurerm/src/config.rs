//! Provider configuration: attributes with `ARM_*` environment fallbacks

use std::fmt;
use std::str::FromStr;

use tfplug::types::{AttributePath, DynamicValue};

use crate::api::{ApiError, ClientSecretCredential, Clients, Credential};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    #[default]
    Public,
    UsGovernment,
    China,
}

impl CloudEnvironment {
    pub fn resource_manager_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://management.azure.com/",
            CloudEnvironment::UsGovernment => "https://management.usgovcloudapi.net/",
            CloudEnvironment::China => "https://management.chinacloudapi.cn/",
        }
    }

    pub fn authority_host(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://login.microsoftonline.com/",
            CloudEnvironment::UsGovernment => "https://login.microsoftonline.us/",
            CloudEnvironment::China => "https://login.chinacloudapi.cn/",
        }
    }
}

impl FromStr for CloudEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(CloudEnvironment::Public),
            "usgovernment" => Ok(CloudEnvironment::UsGovernment),
            "china" => Ok(CloudEnvironment::China),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloudEnvironment::Public => "public",
            CloudEnvironment::UsGovernment => "usgovernment",
            CloudEnvironment::China => "china",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{attribute} is required (set in provider config or {env_var} env var)")]
    Missing {
        attribute: &'static str,
        env_var: &'static str,
    },

    #[error("{attribute} must be a UUID, got {value:?}")]
    InvalidUuid {
        attribute: &'static str,
        value: String,
    },

    #[error("unknown environment {0:?}, expected public, usgovernment or china")]
    UnknownEnvironment(String),

    #[error("{attribute} must be an absolute http(s) URL, got {value:?}")]
    InvalidUrl {
        attribute: &'static str,
        value: String,
    },

    #[error("Failed to create API client: {0}")]
    Client(#[from] ApiError),
}

impl ConfigError {
    /// The provider attribute the error refers to, if any
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            ConfigError::Missing { attribute, .. }
            | ConfigError::InvalidUuid { attribute, .. }
            | ConfigError::InvalidUrl { attribute, .. } => Some(attribute),
            ConfigError::UnknownEnvironment(_) => Some("environment"),
            ConfigError::Client(_) => None,
        }
    }
}

/// (attribute, environment variable)
pub const SUBSCRIPTION_ID: (&str, &str) = ("subscription_id", "ARM_SUBSCRIPTION_ID");
pub const TENANT_ID: (&str, &str) = ("tenant_id", "ARM_TENANT_ID");
pub const CLIENT_ID: (&str, &str) = ("client_id", "ARM_CLIENT_ID");
pub const CLIENT_SECRET: (&str, &str) = ("client_secret", "ARM_CLIENT_SECRET");
pub const ENVIRONMENT: (&str, &str) = ("environment", "ARM_ENVIRONMENT");
pub const RESOURCE_MANAGER_ENDPOINT: (&str, &str) =
    ("resource_manager_endpoint", "ARM_RESOURCE_MANAGER_ENDPOINT");
pub const AUTHORITY_HOST: (&str, &str) = ("authority_host", "ARM_AUTHORITY_HOST");

#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub environment: CloudEnvironment,
    pub resource_manager_endpoint: String,
    pub authority_host: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("environment", &self.environment)
            .field("resource_manager_endpoint", &self.resource_manager_endpoint)
            .field("authority_host", &self.authority_host)
            .finish_non_exhaustive()
    }
}

/// Config value first, then the environment. Empty strings count as unset.
fn lookup(config: &DynamicValue, (attribute, env_var): (&str, &str)) -> Option<String> {
    config
        .get_string(&AttributePath::new(attribute))
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
}

fn require(config: &DynamicValue, key: (&'static str, &'static str)) -> Result<String, ConfigError> {
    lookup(config, key).ok_or(ConfigError::Missing {
        attribute: key.0,
        env_var: key.1,
    })
}

fn require_uuid(
    config: &DynamicValue,
    key: (&'static str, &'static str),
) -> Result<String, ConfigError> {
    let value = require(config, key)?;
    check_uuid(key.0, &value)?;
    Ok(value)
}

pub fn check_uuid(attribute: &'static str, value: &str) -> Result<(), ConfigError> {
    uuid::Uuid::try_parse(value)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidUuid {
            attribute,
            value: value.to_string(),
        })
}

fn endpoint(
    config: &DynamicValue,
    key: (&'static str, &'static str),
    default: &str,
) -> Result<String, ConfigError> {
    let value = lookup(config, key).unwrap_or_else(|| default.to_string());
    match url::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "https" | "http") && url.host().is_some() => Ok(value),
        _ => Err(ConfigError::InvalidUrl {
            attribute: key.0,
            value,
        }),
    }
}

impl ProviderConfig {
    /// Resolve every setting, collecting all problems rather than stopping at
    /// the first one
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut keep = |result: Result<String, ConfigError>| match result {
            Ok(v) => v,
            Err(e) => {
                errors.push(e);
                String::new()
            }
        };

        let subscription_id = keep(require_uuid(config, SUBSCRIPTION_ID));
        let tenant_id = keep(require_uuid(config, TENANT_ID));
        let client_id = keep(require(config, CLIENT_ID));
        let client_secret = keep(require(config, CLIENT_SECRET));

        let environment = match lookup(config, ENVIRONMENT) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                errors.push(e);
                CloudEnvironment::default()
            }),
            None => CloudEnvironment::default(),
        };

        let resource_manager_endpoint = match endpoint(
            config,
            RESOURCE_MANAGER_ENDPOINT,
            environment.resource_manager_endpoint(),
        ) {
            Ok(v) => v,
            Err(e) => {
                errors.push(e);
                String::new()
            }
        };
        let authority_host = match endpoint(config, AUTHORITY_HOST, environment.authority_host()) {
            Ok(v) => v,
            Err(e) => {
                errors.push(e);
                String::new()
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            subscription_id,
            tenant_id,
            client_id,
            client_secret,
            environment,
            resource_manager_endpoint,
            authority_host,
        })
    }

    pub fn credential(&self) -> Credential {
        Credential::ClientSecret(ClientSecretCredential::new(
            &self.authority_host,
            &self.tenant_id,
            &self.client_id,
            &self.client_secret,
            &self.resource_manager_endpoint,
        ))
    }

    pub fn build_clients(&self) -> Result<Clients, ConfigError> {
        let client = crate::api::Client::new(&self.resource_manager_endpoint, self.credential())?;
        Ok(Clients::new(&self.subscription_id, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::Dynamic;

    const SUB: &str = "00000000-0000-0000-0000-000000000001";
    const TENANT: &str = "00000000-0000-0000-0000-000000000002";

    const ALL_VARS: [&str; 7] = [
        "ARM_SUBSCRIPTION_ID",
        "ARM_TENANT_ID",
        "ARM_CLIENT_ID",
        "ARM_CLIENT_SECRET",
        "ARM_ENVIRONMENT",
        "ARM_RESOURCE_MANAGER_ENDPOINT",
        "ARM_AUTHORITY_HOST",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    fn config(pairs: &[(&str, &str)]) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Dynamic::String(v.to_string())))
                .collect(),
        ))
    }

    #[test]
    #[serial]
    fn resolves_from_config_with_public_defaults() {
        clear_env();
        let resolved = ProviderConfig::from_config(&config(&[
            ("subscription_id", SUB),
            ("tenant_id", TENANT),
            ("client_id", "app"),
            ("client_secret", "secret"),
        ]))
        .unwrap();

        assert_eq!(resolved.subscription_id, SUB);
        assert_eq!(resolved.environment, CloudEnvironment::Public);
        assert_eq!(resolved.resource_manager_endpoint, "https://management.azure.com/");
        assert_eq!(resolved.authority_host, "https://login.microsoftonline.com/");
    }

    #[test]
    #[serial]
    fn falls_back_to_environment() {
        clear_env();
        std::env::set_var("ARM_SUBSCRIPTION_ID", SUB);
        std::env::set_var("ARM_TENANT_ID", TENANT);
        std::env::set_var("ARM_CLIENT_ID", "env-app");
        std::env::set_var("ARM_CLIENT_SECRET", "env-secret");
        std::env::set_var("ARM_ENVIRONMENT", "china");

        let resolved = ProviderConfig::from_config(&config(&[("client_id", "config-app")])).unwrap();

        assert_eq!(resolved.client_id, "config-app");
        assert_eq!(resolved.client_secret, "env-secret");
        assert_eq!(resolved.environment, CloudEnvironment::China);
        assert_eq!(
            resolved.resource_manager_endpoint,
            "https://management.chinacloudapi.cn/"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn reports_every_problem() {
        clear_env();
        let errors = ProviderConfig::from_config(&config(&[
            ("subscription_id", "not-a-uuid"),
            ("environment", "mars"),
            ("resource_manager_endpoint", "management.azure.com"),
        ]))
        .unwrap_err();

        let attributes: Vec<_> = errors.iter().filter_map(|e| e.attribute()).collect();
        assert_eq!(
            attributes,
            vec![
                "subscription_id",
                "tenant_id",
                "client_id",
                "client_secret",
                "environment",
                "resource_manager_endpoint"
            ]
        );
        assert!(errors[1].to_string().contains("ARM_TENANT_ID"));
    }

    #[test]
    fn debug_hides_secret() {
        let resolved = ProviderConfig {
            subscription_id: SUB.to_string(),
            tenant_id: TENANT.to_string(),
            client_id: "app".to_string(),
            client_secret: "hunter2".to_string(),
            environment: CloudEnvironment::Public,
            resource_manager_endpoint: "https://management.azure.com/".to_string(),
            authority_host: "https://login.microsoftonline.com/".to_string(),
        };
        assert!(!format!("{:?}", resolved).contains("hunter2"));
    }

    #[test]
    fn environment_names_round_trip() {
        for env in [
            CloudEnvironment::Public,
            CloudEnvironment::UsGovernment,
            CloudEnvironment::China,
        ] {
            assert_eq!(env.to_string().parse::<CloudEnvironment>().unwrap(), env);
        }
        assert_eq!(
            "USGovernment".parse::<CloudEnvironment>().unwrap(),
            CloudEnvironment::UsGovernment
        );
    }
}
