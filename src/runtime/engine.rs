//! Entry, exit and behavior binding over the node arena.

use super::context::{StateContext, StateHandler};
use super::region::{Arena, BoundBehavior, Lifecycle, Node, NodeId, RegionId};
use super::EventSender;
use crate::builder::MachineDefinition;
use crate::client::behavior::{BehaviorEnv, ErasedBehavior};
use crate::client::ClientRegistry;
use crate::config::MachineConfig;
use crate::core::{Event, State, StateHistory, StateTransition};
use crate::error::{ConfigurationError, MachineError};
use crate::global::GlobalData;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counters kept by a machine over its lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStats {
    pub events_dispatched: u64,
    pub transitions: u64,
    pub discarded: u64,
    pub unhandled: u64,
    pub terminations: u64,
    pub entries: u64,
    pub exits: u64,
    /// Behaviors that could not be configured or whose entry failed
    pub behavior_failures: u64,
}

pub(crate) struct Engine<S: State> {
    pub definition: Arc<MachineDefinition<S>>,
    pub arena: Arena<S>,
    pub clients: ClientRegistry,
    pub global: GlobalData,
    pub sender: EventSender,
    pub config: MachineConfig,
    pub history: StateHistory<S>,
    pub stats: MachineStats,
}

impl<S: State> Engine<S> {
    pub fn new(definition: Arc<MachineDefinition<S>>, config: MachineConfig, sender: EventSender) -> Self {
        Self {
            definition,
            arena: Arena::new(),
            clients: ClientRegistry::new(),
            global: GlobalData::new(),
            sender,
            history: StateHistory::with_limit(config.history_limit),
            config,
            stats: MachineStats::default(),
        }
    }

    /// Seed every root region with its initial state.
    pub fn enter_roots(&mut self) {
        let definition = Arc::clone(&self.definition);
        for name in definition.root_regions() {
            let Some(region) = definition.region(name) else {
                continue;
            };
            let id = self.arena.add_region(name, None, region.client);
            self.enter_state(id, region.initial.clone(), None, None, None);
        }
    }

    /// Run `f` with the node's handler taken out, so the handler can be
    /// given a context borrowing the rest of the engine.
    pub fn with_handler<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut dyn StateHandler<S>, &mut StateContext<'_, S>) -> R,
    ) -> Option<R> {
        let entry = self.arena.node_mut(node)?;
        let mut handler = entry.handler.take()?;
        let state = entry.state.clone();
        let result = {
            let mut ctx = StateContext {
                engine: self,
                node,
                state,
            };
            f(handler.as_mut(), &mut ctx)
        };
        if let Some(entry) = self.arena.node_mut(node) {
            entry.handler = Some(handler);
        }
        Some(result)
    }

    /// Create a node for `state` in `region` and enter it top-down.
    ///
    /// Nested regions exist before the handler's `on_entry` runs, are
    /// seeded after it, and static behaviors bind last.
    pub fn enter_state(
        &mut self,
        region: RegionId,
        state: S,
        from: Option<S>,
        cause: Option<&Event>,
        tag: Option<&str>,
    ) {
        let definition = Arc::clone(&self.definition);
        let Some(def) = definition.state(&state) else {
            tracing::error!(state = state.name(), "state has no definition");
            return;
        };
        let region_name = self
            .arena
            .region(region)
            .map(|r| r.name.clone())
            .unwrap_or_default();

        let node = self
            .arena
            .add_node(Node::new(state.clone(), region, def.make_handler()));
        self.history.record(StateTransition {
            region: region_name.clone(),
            from,
            to: state.clone(),
            event: cause.map(|e| e.kind().clone()),
            tag: tag.map(str::to_string),
            timestamp: Utc::now(),
        });
        self.stats.entries += 1;
        tracing::info!(
            machine = %self.config.name,
            region = %region_name,
            state = state.name(),
            "state entered"
        );

        for nested in &def.regions {
            self.arena.add_region(&nested.name, Some(node), nested.client);
        }

        self.with_handler(node, |handler, ctx| handler.on_entry(ctx));

        let nested_ids = self
            .arena
            .node(node)
            .map(|n| n.regions.clone())
            .unwrap_or_default();
        for (id, nested) in nested_ids.into_iter().zip(&def.regions) {
            self.enter_state(id, nested.initial.clone(), None, None, None);
        }

        for behavior in &def.behaviors {
            if let Err(error) = self.bind_behavior(node, &behavior.region, (behavior.factory)()) {
                tracing::debug!(
                    state = state.name(),
                    behavior = behavior.name,
                    error = %error,
                    "state stays active without behavior"
                );
            }
        }

        if let Some(entry) = self.arena.node_mut(node) {
            entry
                .logic_units
                .extend(def.logic_units.iter().map(|factory| factory()));
        }
    }

    /// Exit a node's activation but leave it current in its region.
    ///
    /// Nested regions go first (reverse declaration order), then the
    /// handler's `on_exit`, then bound behaviors in reverse binding order.
    /// Logic units are dropped. A second call does nothing.
    pub fn release_node(&mut self, id: NodeId) {
        let Some(node) = self.arena.node(id) else {
            return;
        };
        if !node.is_active() {
            return;
        }
        let nested = node.regions.clone();
        for region in nested.into_iter().rev() {
            self.exit_region(region);
        }

        self.with_handler(id, |handler, ctx| handler.on_exit(ctx));

        let Some(node) = self.arena.node_mut(id) else {
            return;
        };
        node.lifecycle = Lifecycle::Terminated;
        node.handler = None;
        node.logic_units.clear();
        let behaviors = std::mem::take(&mut node.behaviors);
        let state = node.state.clone();

        for mut bound in behaviors.into_iter().rev() {
            bound.behavior.exit(BehaviorEnv {
                clients: &mut self.clients,
                config: &self.config,
                sender: &self.sender,
                global: &mut self.global,
            });
            if let Some(region) = self.arena.region_mut(bound.region) {
                if let Some(pos) = region.clients_in_use.iter().position(|c| *c == bound.client) {
                    region.clients_in_use.remove(pos);
                }
            }
        }

        self.stats.exits += 1;
        tracing::info!(machine = %self.config.name, state = state.name(), "state exited");
    }

    /// Exit a node and remove it from its region.
    pub fn exit_node(&mut self, id: NodeId) {
        self.release_node(id);
        self.arena.remove_node(id);
    }

    /// Exit the region's current node, then remove the region.
    pub fn exit_region(&mut self, id: RegionId) {
        if let Some(current) = self.arena.region(id).and_then(|r| r.current) {
            self.exit_node(current);
        }
        self.arena.remove_region(id);
    }

    /// Bind a behavior owned by `node` to the live region `region`.
    pub fn bind_behavior(
        &mut self,
        node: NodeId,
        region: &str,
        behavior: Box<dyn ErasedBehavior>,
    ) -> Result<(), MachineError> {
        let name = behavior.name();
        let outcome = self.try_bind(node, region, behavior);
        if outcome.is_err() {
            self.stats.behavior_failures += 1;
        }
        match &outcome {
            Ok(()) => {
                tracing::debug!(region, behavior = name, "behavior bound");
            }
            Err(e @ MachineError::Configuration(_)) => {
                tracing::error!(region, behavior = name, error = %e, "behavior not configured");
            }
            Err(e) => {
                tracing::warn!(region, behavior = name, error = %e, "behavior entry failed");
            }
        }
        outcome
    }

    fn try_bind(
        &mut self,
        node: NodeId,
        region_name: &str,
        mut behavior: Box<dyn ErasedBehavior>,
    ) -> Result<(), MachineError> {
        let region = self
            .arena
            .find_region(region_name)
            .ok_or_else(|| ConfigurationError::UnknownRegion {
                region: region_name.to_string(),
            })?;
        let backing = self
            .arena
            .region(region)
            .and_then(|r| r.client)
            .ok_or_else(|| ConfigurationError::RegionWithoutClient {
                region: region_name.to_string(),
            })?;
        if backing != behavior.client() {
            return Err(ConfigurationError::IncompatibleClient {
                region: region_name.to_string(),
                behavior: behavior.name(),
                expected: behavior.client().name(),
                found: backing.name(),
            }
            .into());
        }

        let entered = behavior.enter(BehaviorEnv {
            clients: &mut self.clients,
            config: &self.config,
            sender: &self.sender,
            global: &mut self.global,
        });
        if let Err(MachineError::ClientUnavailable { .. }) = entered {
            return entered;
        }

        // kept after a failed entry: its exit hook must still run
        if let Some(owner) = self.arena.node_mut(node) {
            owner.behaviors.push(BoundBehavior {
                region,
                client: backing,
                behavior,
            });
        }
        if let Some(target) = self.arena.region_mut(region) {
            target.clients_in_use.push(backing);
        }
        entered
    }

    /// Show `event` to every logic unit of every live node and queue what
    /// they derive.
    pub fn notify_logic_units(&mut self, event: &Event) {
        for id in self.arena.nodes_in_order() {
            let Some(node) = self.arena.node_mut(id) else {
                continue;
            };
            let derived: Vec<Event> = node
                .logic_units
                .iter_mut()
                .filter_map(|unit| unit.notify(event))
                .collect();
            for event in derived {
                tracing::debug!(event = %event.kind(), "logic unit posted event");
                if let Err(e) = self.sender.post(event) {
                    tracing::warn!(error = %e, "logic unit could not post event");
                }
            }
        }
    }

    /// Every root region sits in a final state.
    pub fn is_finished(&self) -> bool {
        let roots = self.arena.roots();
        !roots.is_empty()
            && roots.iter().all(|id| {
                self.arena
                    .region(*id)
                    .and_then(|r| r.current)
                    .and_then(|n| self.arena.node(n))
                    .is_some_and(|n| n.state.is_final())
            })
    }

    pub fn contains_state(&self, state: &S) -> bool {
        self.arena
            .nodes_in_order()
            .into_iter()
            .any(|id| self.arena.node(id).is_some_and(|n| n.state == *state))
    }

    /// Exit every root region (bottom-up, last declared first) and shut
    /// every client down.
    pub fn teardown(&mut self) {
        let roots = self.arena.roots().to_vec();
        for region in roots.into_iter().rev() {
            self.exit_region(region);
        }
        self.clients.shutdown_all();
    }

    /// Verify the structural invariants of the active configuration.
    pub fn check_invariants(&self) -> Result<(), MachineError> {
        let fail = |reason: String| Err(MachineError::Inconsistent { reason });

        for (id, region) in self.arena.regions() {
            let Some(current) = region.current else {
                return fail(format!("region '{}' has no current state", region.name));
            };
            let Some(node) = self.arena.node(current) else {
                return fail(format!("region '{}' points at a missing node", region.name));
            };
            if node.region != id {
                return fail(format!(
                    "state '{}' is current in region '{}' but belongs elsewhere",
                    node.state.name(),
                    region.name
                ));
            }
            if let Some(parent) = region.parent {
                if !self.arena.node(parent).is_some_and(|p| p.is_active()) {
                    return fail(format!("region '{}' outlived its parent", region.name));
                }
            }
        }

        let reachable = self.arena.nodes_in_order().len();
        if reachable != self.arena.node_count() {
            return fail(format!(
                "{} nodes exist but only {reachable} are current",
                self.arena.node_count()
            ));
        }

        for id in self.arena.nodes_in_order() {
            let Some(node) = self.arena.node(id) else {
                continue;
            };
            if !node.is_active()
                && (!node.regions.is_empty() || !node.behaviors.is_empty() || node.handler.is_some())
            {
                return fail(format!(
                    "terminated state '{}' still holds resources",
                    node.state.name()
                ));
            }
        }
        Ok(())
    }
}
