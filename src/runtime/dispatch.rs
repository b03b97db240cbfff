//! Run-to-completion event dispatch.
//!
//! An event is offered to the chain of each active leaf in turn, leaf to
//! root. At each node a declared custom reaction runs first, then the
//! node's transition table. The first transition or discard ends the
//! dispatch; an event nobody claims is dropped.

use super::context::Reaction;
use super::engine::Engine;
use super::region::NodeId;
use crate::core::{Event, EventKind, State};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// How a dispatched event was consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// A table rule fired.
    Transitioned,
    /// A custom reaction discarded it.
    Discarded,
    /// Nobody claimed it.
    Unhandled,
}

/// What happened to one event.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchReport<S: State> {
    pub event: EventKind,
    pub disposition: Disposition,
    /// The state whose reaction or table consumed the event.
    pub handled_by: Option<S>,
    /// States that terminated themselves while the event was offered.
    pub terminated: Vec<S>,
}

impl<S: State> DispatchReport<S> {
    pub fn is_handled(&self) -> bool {
        self.disposition != Disposition::Unhandled
    }
}

impl<S: State> Engine<S> {
    /// Dispatch one event to completion.
    pub fn dispatch(&mut self, event: &Event) -> DispatchReport<S> {
        self.stats.events_dispatched += 1;
        self.notify_logic_units(event);

        let mut report = DispatchReport {
            event: event.kind().clone(),
            disposition: Disposition::Unhandled,
            handled_by: None,
            terminated: Vec::new(),
        };
        let mut visited = HashSet::new();

        for leaf in self.arena.leaves() {
            let mut current = Some(leaf);
            while let Some(id) = current {
                // gone when an ancestor terminated earlier in this dispatch
                let Some(node) = self.arena.node(id) else {
                    break;
                };
                if !visited.insert(id) {
                    break;
                }
                let state = node.state.clone();
                let parent = self.arena.parent_of(id);

                match self.offer(id, event) {
                    Some(Reaction::Discard) => {
                        self.stats.discarded += 1;
                        tracing::debug!(event = %event.kind(), state = state.name(), "event discarded");
                        report.disposition = Disposition::Discarded;
                        report.handled_by = Some(state);
                        return report;
                    }
                    Some(Reaction::Terminate) => {
                        self.release_node(id);
                        self.stats.terminations += 1;
                        tracing::info!(state = state.name(), event = %event.kind(), "state terminated");
                        report.terminated.push(state.clone());
                    }
                    Some(Reaction::Forward) | None => {}
                }

                if let Some((target, tag)) = self.find_rule(id, event) {
                    self.transition(id, target, tag.as_deref(), event);
                    report.disposition = Disposition::Transitioned;
                    report.handled_by = Some(state);
                    return report;
                }
                current = parent;
            }
        }

        self.stats.unhandled += 1;
        tracing::debug!(event = %event.kind(), "event unhandled");
        report
    }

    /// Run the node's custom reaction if it is active and declared one for
    /// this kind.
    fn offer(&mut self, id: NodeId, event: &Event) -> Option<Reaction> {
        let node = self.arena.node(id)?;
        if !node.is_active() {
            return None;
        }
        let declared = self
            .definition
            .state(&node.state)
            .is_some_and(|def| def.reacts_to(event.kind()));
        if !declared {
            return None;
        }
        self.with_handler(id, |handler, ctx| handler.react(event, ctx))
    }

    /// First table rule of the node's state that accepts `event`.
    fn find_rule(&self, id: NodeId, event: &Event) -> Option<(S, Option<String>)> {
        let node = self.arena.node(id)?;
        self.definition
            .state(&node.state)?
            .rules
            .iter()
            .find(|rule| rule.matches(event))
            .map(|rule| (rule.target.clone(), rule.tag.clone()))
    }

    /// Exit the node in the target's region that contains `source`, then
    /// enter `target` in that region.
    fn transition(&mut self, source: NodeId, target: S, tag: Option<&str>, event: &Event) {
        let definition = Arc::clone(&self.definition);
        let Some(target_region) = definition.region_of(&target) else {
            tracing::error!(target = target.name(), "transition target belongs to no region");
            return;
        };

        let mut exiting = source;
        let (region, from) = loop {
            let Some(node) = self.arena.node(exiting) else {
                return;
            };
            let Some(region) = self.arena.region(node.region) else {
                return;
            };
            if region.name == target_region {
                break (node.region, node.state.clone());
            }
            match region.parent {
                Some(parent) => exiting = parent,
                None => {
                    tracing::error!(
                        target = target.name(),
                        region = target_region,
                        "transition target region is not above the source"
                    );
                    return;
                }
            }
        };

        tracing::info!(
            machine = %self.config.name,
            from = from.name(),
            to = target.name(),
            event = %event.kind(),
            tag,
            "transition"
        );
        self.exit_node(exiting);
        self.enter_state(region, target, Some(from), Some(event), tag);
        self.stats.transitions += 1;
    }
}
