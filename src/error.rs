//! Runtime error types.
//!
//! None of these are fatal to a running machine: the dispatcher logs them
//! and degrades the feature that failed.

use thiserror::Error;

/// Failures of a client while initializing or issuing requests.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("client '{client}' requires parameter '{key}'")]
    MissingParameter { client: &'static str, key: String },

    #[error("client '{client}' has an invalid parameter '{key}': {reason}")]
    InvalidParameter {
        client: &'static str,
        key: String,
        reason: String,
    },

    #[error("client '{client}' rejected the request: {reason}")]
    RequestRejected { client: &'static str, reason: String },

    #[error("client '{client}' needs a running tokio runtime")]
    NoRuntime { client: &'static str },
}

/// Failure reported by a client behavior's entry hook.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BehaviorError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0}")]
    Failed(String),
}

/// A behavior could not be bound to the region it asked for.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("region '{region}' is not active")]
    UnknownRegion { region: String },

    #[error("region '{region}' has no backing client")]
    RegionWithoutClient { region: String },

    #[error("behavior '{behavior}' needs client '{expected}' but region '{region}' is backed by '{found}'")]
    IncompatibleClient {
        region: String,
        behavior: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors surfaced by the machine runtime.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MachineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("client '{client}' is unavailable: {source}")]
    ClientUnavailable {
        client: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("behavior '{behavior}' failed to enter: {source}")]
    BehaviorFailed {
        behavior: &'static str,
        #[source]
        source: BehaviorError,
    },

    #[error("client '{client}' has not been created")]
    ClientNotCreated { client: &'static str },

    #[error("state machine has already finished")]
    Finished,

    #[error("event queue is closed")]
    QueueClosed,

    #[error("machine structure is inconsistent: {reason}")]
    Inconsistent { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_client_message_names_the_parameter() {
        let error = MachineError::ClientUnavailable {
            client: "navigation",
            source: ClientError::MissingParameter {
                client: "navigation",
                key: "server".to_string(),
            },
        };

        assert_eq!(
            error.to_string(),
            "client 'navigation' is unavailable: client 'navigation' requires parameter 'server'"
        );
    }

    #[test]
    fn configuration_errors_convert_into_machine_errors() {
        let error: MachineError = ConfigurationError::RegionWithoutClient {
            region: "tool".to_string(),
        }
        .into();

        assert!(matches!(error, MachineError::Configuration(_)));
        assert_eq!(error.to_string(), "region 'tool' has no backing client");
    }

    #[test]
    fn client_errors_convert_into_behavior_errors() {
        let error: BehaviorError = ClientError::RequestRejected {
            client: "gripper",
            reason: "busy".to_string(),
        }
        .into();

        assert_eq!(
            error.to_string(),
            "client 'gripper' rejected the request: busy"
        );
    }
}
