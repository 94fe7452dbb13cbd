//! Shared ARM payload pieces

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body ARM returns for failed requests
#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ArmErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Azure resource tags
pub type Tags = HashMap<String, String>;

/// `Enabled` / `Disabled` toggles used across several APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnabledState {
    Enabled,
    Disabled,
}

impl From<bool> for EnabledState {
    fn from(value: bool) -> Self {
        if value {
            EnabledState::Enabled
        } else {
            EnabledState::Disabled
        }
    }
}

impl From<EnabledState> for bool {
    fn from(value: EnabledState) -> Self {
        value == EnabledState::Enabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubResource {
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_version(version: &str) -> Self {
        Self::new().add("api-version", version)
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_encodes_values() {
        let query = ApiQueryParams::api_version("2020-08-01")
            .add("$filter", "kind eq 'WindowsEvent'")
            .add_optional("force", Some(true))
            .add_optional("skip", None::<u32>)
            .to_query_string();

        assert_eq!(
            query,
            "?api-version=2020-08-01&$filter=kind%20eq%20%27WindowsEvent%27&force=true"
        );
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn enabled_state_round_trips_bool() {
        assert_eq!(EnabledState::from(true), EnabledState::Enabled);
        assert!(!bool::from(EnabledState::Disabled));
        assert_eq!(serde_json::to_string(&EnabledState::Enabled).unwrap(), "\"Enabled\"");
    }

    #[test]
    fn arm_error_tolerates_missing_fields() {
        let parsed: ArmErrorResponse = serde_json::from_str(r#"{"error":{"code":"Oops"}}"#).unwrap();
        assert_eq!(parsed.error.code, "Oops");
        assert_eq!(parsed.error.message, "");
    }
}
