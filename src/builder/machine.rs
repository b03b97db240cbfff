//! Builder for machine definitions.

use super::error::BuildError;
use super::region::RegionDef;
use super::state::StateDef;
use crate::client::ClientId;
use crate::core::State;
use crate::validation::validate;
use std::collections::HashMap;
use stillwater::validation::Validation;

/// Builder for a [`MachineDefinition`] with a fluent API.
///
/// States that are members of a region but have no [`StateDef`] get an
/// empty definition: no table, no handler.
///
/// # Example
///
/// ```rust
/// use orthostate::builder::{MachineBuilder, RegionDef, StateDef};
/// use orthostate::state_enum;
///
/// state_enum! {
///     enum Light {
///         Red,
///         Green,
///     }
/// }
///
/// let definition = MachineBuilder::new()
///     .region(RegionDef::new("main", Light::Red).state(Light::Green))
///     .state(StateDef::new(Light::Red).on("go", Light::Green))
///     .state(StateDef::new(Light::Green).on("stop", Light::Red))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.region_of(&Light::Green), Some("main"));
/// ```
pub struct MachineBuilder<S: State> {
    regions: Vec<RegionDef<S>>,
    states: Vec<StateDef<S>>,
}

impl<S: State> MachineBuilder<S> {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Add a root region. Root regions are entered in the order added.
    pub fn region(mut self, region: RegionDef<S>) -> Self {
        self.regions.push(region);
        self
    }

    /// Add a state definition.
    pub fn state(mut self, state: StateDef<S>) -> Self {
        self.states.push(state);
        self
    }

    /// Add multiple state definitions at once.
    pub fn states(mut self, states: impl IntoIterator<Item = StateDef<S>>) -> Self {
        self.states.extend(states);
        self
    }

    /// Validate and index the definition.
    /// Returns every problem found if it is inconsistent.
    pub fn build(self) -> Result<MachineDefinition<S>, BuildError> {
        match validate(&self.regions, &self.states) {
            Validation::Failure(errors) => {
                Err(BuildError::Invalid(errors.iter().cloned().collect()))
            }
            Validation::Success(_) => Ok(MachineDefinition::index(self.regions, self.states)),
        }
    }
}

impl<S: State> Default for MachineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A region as indexed in a definition.
#[derive(Clone, Debug)]
pub(crate) struct RegionEntry<S: State> {
    pub def: RegionDef<S>,
    pub parent: Option<S>,
}

/// Validated, immutable description of a machine, shared by every
/// machine built from it.
#[derive(Debug)]
pub struct MachineDefinition<S: State> {
    roots: Vec<String>,
    regions: HashMap<String, RegionEntry<S>>,
    states: HashMap<S, StateDef<S>>,
    region_of: HashMap<S, String>,
}

impl<S: State> MachineDefinition<S> {
    fn index(roots: Vec<RegionDef<S>>, defs: Vec<StateDef<S>>) -> Self {
        let mut states: HashMap<S, StateDef<S>> = HashMap::new();
        let mut regions = HashMap::new();
        let mut root_names = Vec::new();
        let mut pending: Vec<(RegionDef<S>, Option<S>)> =
            roots.into_iter().map(|region| (region, None)).collect();

        for def in defs {
            pending.extend(
                def.regions
                    .iter()
                    .map(|region| (region.clone(), Some(def.state.clone()))),
            );
            states.insert(def.state.clone(), def);
        }

        let mut region_of = HashMap::new();
        for (region, parent) in pending {
            if parent.is_none() {
                root_names.push(region.name.clone());
            }
            for state in &region.states {
                region_of.insert(state.clone(), region.name.clone());
                states
                    .entry(state.clone())
                    .or_insert_with(|| StateDef::new(state.clone()));
            }
            regions.insert(
                region.name.clone(),
                RegionEntry {
                    def: region,
                    parent,
                },
            );
        }

        Self {
            roots: root_names,
            regions,
            states,
            region_of,
        }
    }

    /// Names of the root regions, in entry order.
    pub fn root_regions(&self) -> &[String] {
        &self.roots
    }

    pub fn state(&self, state: &S) -> Option<&StateDef<S>> {
        self.states.get(state)
    }

    pub fn region(&self, name: &str) -> Option<&RegionDef<S>> {
        self.regions.get(name).map(|entry| &entry.def)
    }

    /// Name of the region `state` is a member of.
    pub fn region_of(&self, state: &S) -> Option<&str> {
        self.region_of.get(state).map(String::as_str)
    }

    /// The state owning region `name`, `None` for root regions.
    pub fn region_parent(&self, name: &str) -> Option<&S> {
        self.regions.get(name)?.parent.as_ref()
    }

    pub fn region_client(&self, name: &str) -> Option<ClientId> {
        self.regions.get(name)?.def.client
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TimerClient;
    use crate::validation::DefinitionError;

    crate::state_enum! {
        enum Mission {
            Navigate,
            Dock,
            Charge,
            Timer,
            Done,
        }
        final: [Done]
    }

    #[test]
    fn build_indexes_regions_and_states() {
        let definition = MachineBuilder::new()
            .region(RegionDef::new("main", Mission::Navigate).states([Mission::Dock, Mission::Done]))
            .region(RegionDef::new("timer", Mission::Timer).with_client::<TimerClient>())
            .state(StateDef::new(Mission::Navigate).on("arrived", Mission::Dock))
            .state(
                StateDef::new(Mission::Dock)
                    .on("docked", Mission::Done)
                    .region(RegionDef::new("power", Mission::Charge)),
            )
            .build()
            .unwrap();

        assert_eq!(definition.root_regions(), &["main".to_string(), "timer".to_string()]);
        assert_eq!(definition.region_of(&Mission::Charge), Some("power"));
        assert_eq!(definition.region_parent("power"), Some(&Mission::Dock));
        assert_eq!(definition.region_parent("main"), None);
        assert_eq!(
            definition.region_client("timer"),
            Some(ClientId::of::<TimerClient>())
        );
        assert_eq!(definition.region_count(), 3);
        // members without a StateDef get an empty one
        assert_eq!(definition.state_count(), 5);
        assert!(definition.state(&Mission::Timer).unwrap().rules().is_empty());
    }

    #[test]
    fn build_reports_every_problem() {
        let result = MachineBuilder::new()
            .region(RegionDef::new("main", Mission::Navigate))
            .state(StateDef::new(Mission::Navigate).on("arrived", Mission::Dock))
            .state(StateDef::new(Mission::Charge))
            .build();

        let err = result.unwrap_err();
        assert_eq!(
            err.problems(),
            &[
                DefinitionError::OrphanState {
                    state: "Charge".to_string()
                },
                DefinitionError::UnknownTarget {
                    state: "Navigate".to_string(),
                    target: "Dock".to_string()
                },
            ]
        );
        assert!(err.to_string().contains("Charge"));
    }

    #[test]
    fn empty_builder_fails() {
        let result = MachineBuilder::<Mission>::new().build();
        assert!(matches!(result, Err(BuildError::Invalid(errors)) if errors == vec![DefinitionError::NoRootRegion]));
    }
}
