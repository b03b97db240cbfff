//! Definition checks using Validation.

use super::violations::DefinitionError;
use crate::builder::{RegionDef, StateDef};
use crate::core::State;
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionError>>;

/// Regions and memberships as declared, duplicates included.
struct Layout<'a, S: State> {
    regions: Vec<(&'a RegionDef<S>, Option<&'a S>)>,
    by_name: HashMap<&'a str, (&'a RegionDef<S>, Option<&'a S>)>,
    membership: HashMap<&'a S, Vec<&'a str>>,
}

impl<'a, S: State> Layout<'a, S> {
    fn new(roots: &'a [RegionDef<S>], states: &'a [StateDef<S>]) -> Self {
        let mut regions: Vec<(&RegionDef<S>, Option<&S>)> =
            roots.iter().map(|region| (region, None)).collect();
        for def in states {
            regions.extend(def.regions.iter().map(|region| (region, Some(&def.state))));
        }

        let mut by_name = HashMap::new();
        let mut membership: HashMap<&S, Vec<&str>> = HashMap::new();
        for &(region, parent) in &regions {
            by_name.entry(region.name.as_str()).or_insert((region, parent));
            for state in &region.states {
                membership.entry(state).or_default().push(region.name.as_str());
            }
        }

        Self {
            regions,
            by_name,
            membership,
        }
    }

    fn region_of(&self, state: &S) -> Option<&'a str> {
        self.membership.get(state)?.first().copied()
    }

    /// `region` followed by every region above it. Stops at a repeat.
    fn chain(&self, region: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(region);
        while let Some(name) = current {
            if !seen.insert(name) {
                break;
            }
            chain.push(name);
            current = self
                .by_name
                .get(name)
                .and_then(|(_, parent)| *parent)
                .and_then(|parent| self.region_of(parent));
        }
        chain
    }
}

/// Validate a whole definition, accumulating every problem.
///
/// Returns `Validation::Success(())` when the definition is consistent and
/// `Validation::Failure` with all problems otherwise.
pub fn validate<S: State>(roots: &[RegionDef<S>], states: &[StateDef<S>]) -> Check {
    let layout = Layout::new(roots, states);
    let mut checks: Vec<Check> = Vec::new();

    checks.push(if roots.is_empty() {
        Validation::fail(DefinitionError::NoRootRegion)
    } else {
        Validation::success(())
    });

    checks.extend(unique_regions(&layout));
    checks.extend(unique_states(states));
    checks.extend(single_membership(&layout));
    checks.extend(states.iter().map(|def| belongs_to_region(&layout, def)));
    checks.extend(no_recursive_regions(&layout));
    for def in states {
        checks.extend(def.rules.iter().map(|rule| reachable(&layout, def, &rule.target)));
        checks.extend(configured_regions(&layout, def));
    }

    Validation::all_vec(checks).map(|_| ())
}

fn unique_regions<S: State>(layout: &Layout<'_, S>) -> Vec<Check> {
    let mut seen = HashSet::new();
    layout
        .regions
        .iter()
        .filter(|(region, _)| !seen.insert(region.name.as_str()))
        .map(|(region, _)| {
            Validation::fail(DefinitionError::DuplicateRegion {
                region: region.name.clone(),
            })
        })
        .collect()
}

fn unique_states<S: State>(states: &[StateDef<S>]) -> Vec<Check> {
    let mut seen = HashSet::new();
    states
        .iter()
        .filter(|def| !seen.insert(&def.state))
        .map(|def| {
            Validation::fail(DefinitionError::DuplicateState {
                state: def.state.name().to_string(),
            })
        })
        .collect()
}

fn single_membership<S: State>(layout: &Layout<'_, S>) -> Vec<Check> {
    let mut shared: Vec<(&S, &Vec<&str>)> = layout
        .membership
        .iter()
        .filter(|(_, regions)| regions.len() > 1)
        .map(|(state, regions)| (*state, regions))
        .collect();
    shared.sort_by(|a, b| a.0.name().cmp(b.0.name()));
    shared
        .into_iter()
        .map(|(state, regions)| {
            Validation::fail(DefinitionError::StateInSeveralRegions {
                state: state.name().to_string(),
                regions: regions.iter().map(|r| r.to_string()).collect(),
            })
        })
        .collect()
}

fn belongs_to_region<S: State>(layout: &Layout<'_, S>, def: &StateDef<S>) -> Check {
    if layout.region_of(&def.state).is_some() {
        Validation::success(())
    } else {
        Validation::fail(DefinitionError::OrphanState {
            state: def.state.name().to_string(),
        })
    }
}

fn no_recursive_regions<S: State>(layout: &Layout<'_, S>) -> Vec<Check> {
    layout
        .regions
        .iter()
        .filter_map(|(region, parent)| {
            let above = layout.region_of((*parent)?)?;
            layout
                .chain(above)
                .contains(&region.name.as_str())
                .then(|| {
                    Validation::fail(DefinitionError::RecursiveRegion {
                        region: region.name.clone(),
                    })
                })
        })
        .collect()
}

fn reachable<S: State>(layout: &Layout<'_, S>, def: &StateDef<S>, target: &S) -> Check {
    let Some(target_region) = layout.region_of(target) else {
        return Validation::fail(DefinitionError::UnknownTarget {
            state: def.state.name().to_string(),
            target: target.name().to_string(),
        });
    };
    // an orphan source is reported on its own
    let Some(source_region) = layout.region_of(&def.state) else {
        return Validation::success(());
    };
    if layout.chain(source_region).contains(&target_region) {
        Validation::success(())
    } else {
        Validation::fail(DefinitionError::UnreachableTarget {
            state: def.state.name().to_string(),
            target: target.name().to_string(),
            region: target_region.to_string(),
        })
    }
}

fn configured_regions<S: State>(layout: &Layout<'_, S>, def: &StateDef<S>) -> Vec<Check> {
    def.behaviors
        .iter()
        .map(|behavior| {
            let state = def.state.name().to_string();
            let region = behavior.region.clone();
            match layout.by_name.get(behavior.region.as_str()) {
                None => Validation::fail(DefinitionError::UnknownConfiguredRegion { state, region }),
                Some((declared, _)) => match declared.client {
                    None => Validation::fail(DefinitionError::ConfiguredRegionWithoutClient {
                        state,
                        region,
                    }),
                    Some(found) if found != behavior.client => {
                        Validation::fail(DefinitionError::IncompatibleConfiguredClient {
                            state,
                            region,
                            behavior: behavior.name,
                            expected: behavior.client.name(),
                            found: found.name(),
                        })
                    }
                    Some(_) => Validation::success(()),
                },
            }
        })
        .collect()
}
