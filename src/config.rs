//! Machine configuration.
//!
//! Configuration is plain JSON. Client parameters live under `clients`,
//! keyed by the client's name; a client whose section or required keys are
//! missing cannot be created.
//!
//! ```json
//! {
//!   "name": "dance_bot",
//!   "history_limit": 128,
//!   "clients": {
//!     "navigation": { "server": "move_base" },
//!     "timer": { "period_ms": 500 }
//!   }
//! }
//! ```

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_name() -> String {
    "state_machine".to_string()
}

fn default_history_limit() -> usize {
    256
}

/// Runtime configuration of one state machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MachineConfig {
    /// Name used in logs and snapshots
    #[serde(default = "default_name")]
    pub name: String,

    /// Maximum number of history records kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Client parameters keyed by client name
    #[serde(default)]
    pub clients: HashMap<String, serde_json::Value>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            history_limit: default_history_limit(),
            clients: HashMap::new(),
        }
    }
}

impl MachineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Set the parameters of one client.
    pub fn with_client(mut self, client: impl Into<String>, params: serde_json::Value) -> Self {
        self.clients.insert(client.into(), params);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Parameters for the client called `client`.
    pub fn client_params(&self, client: &'static str) -> ClientParams<'_> {
        ClientParams {
            client,
            values: self.clients.get(client),
        }
    }
}

/// Read-only view of one client's parameter section.
#[derive(Clone, Copy, Debug)]
pub struct ClientParams<'a> {
    client: &'static str,
    values: Option<&'a serde_json::Value>,
}

impl<'a> ClientParams<'a> {
    /// Parameters for a client with no configuration section.
    pub fn empty(client: &'static str) -> Self {
        Self {
            client,
            values: None,
        }
    }

    pub fn client(&self) -> &'static str {
        self.client
    }

    /// Whether the client has a configuration section at all.
    pub fn is_present(&self) -> bool {
        self.values.is_some()
    }

    /// Read an optional parameter.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        let Some(value) = self.values.and_then(|values| values.get(key)) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ClientError::InvalidParameter {
                client: self.client,
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Read a parameter the client cannot work without.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, ClientError> {
        self.get(key)?.ok_or_else(|| ClientError::MissingParameter {
            client: self.client,
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = MachineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MachineConfig::default());
        assert_eq!(config.history_limit, 256);
    }

    #[test]
    fn parses_client_sections() {
        let config = MachineConfig::from_json_str(
            r#"{ "name": "bot", "clients": { "navigation": { "server": "move_base" } } }"#,
        )
        .unwrap();

        assert_eq!(config.name, "bot");
        let params = config.client_params("navigation");
        assert!(params.is_present());
        assert_eq!(params.require::<String>("server").unwrap(), "move_base");
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let config = MachineConfig::default();
        let params = config.client_params("navigation");

        assert!(!params.is_present());
        assert_eq!(
            params.require::<String>("server"),
            Err(ClientError::MissingParameter {
                client: "navigation",
                key: "server".to_string(),
            })
        );
    }

    #[test]
    fn invalid_parameter_type_is_reported() {
        let config =
            MachineConfig::default().with_client("timer", json!({ "period_ms": "fast" }));
        let result = config.client_params("timer").get::<u64>("period_ms");

        assert!(matches!(
            result,
            Err(ClientError::InvalidParameter { client: "timer", .. })
        ));
    }

    #[test]
    fn optional_parameter_may_be_absent() {
        let config = MachineConfig::default().with_client("timer", json!({}));
        assert_eq!(
            config.client_params("timer").get::<u64>("period_ms"),
            Ok(None)
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            MachineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = MachineConfig::from_file("/nonexistent/orthostate.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
