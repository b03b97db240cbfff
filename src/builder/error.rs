//! Build errors for machine definitions.

use crate::validation::DefinitionError;
use thiserror::Error;

/// Errors that can occur when building a machine definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("invalid state machine definition: {}", summarize(.0))]
    Invalid(Vec<DefinitionError>),
}

impl BuildError {
    /// Every problem found in the definition.
    pub fn problems(&self) -> &[DefinitionError] {
        match self {
            Self::Invalid(errors) => errors,
        }
    }
}

fn summarize(errors: &[DefinitionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
