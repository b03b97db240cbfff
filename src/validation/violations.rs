//! Problems found in a machine definition.

use thiserror::Error;

/// One problem found while validating a machine definition.
///
/// States are reported by their `State::name`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionError {
    #[error("machine has no root region")]
    NoRootRegion,

    #[error("region '{region}' is declared more than once")]
    DuplicateRegion { region: String },

    #[error("state '{state}' is defined more than once")]
    DuplicateState { state: String },

    #[error("state '{state}' is a member of several regions: {regions:?}")]
    StateInSeveralRegions { state: String, regions: Vec<String> },

    #[error("state '{state}' is defined but belongs to no region")]
    OrphanState { state: String },

    #[error("state '{state}' transitions to '{target}', which belongs to no region")]
    UnknownTarget { state: String, target: String },

    #[error("state '{state}' cannot reach '{target}' in region '{region}': targets must be in the source's region or an ancestor region")]
    UnreachableTarget {
        state: String,
        target: String,
        region: String,
    },

    #[error("region '{region}' is nested inside one of its own states")]
    RecursiveRegion { region: String },

    #[error("state '{state}' configures a behavior on unknown region '{region}'")]
    UnknownConfiguredRegion { state: String, region: String },

    #[error("state '{state}' configures a behavior on region '{region}', which has no client")]
    ConfiguredRegionWithoutClient { state: String, region: String },

    #[error("state '{state}' configures '{behavior}' on region '{region}': needs client '{expected}', region has '{found}'")]
    IncompatibleConfiguredClient {
        state: String,
        region: String,
        behavior: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
