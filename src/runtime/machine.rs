//! The state machine: queue, dispatcher and lifecycle.

use super::dispatch::DispatchReport;
use super::engine::{Engine, MachineStats};
use super::region::{ActiveState, Node};
use super::{EventQueue, EventSender};
use crate::builder::MachineDefinition;
use crate::client::{Client, ClientId};
use crate::config::MachineConfig;
use crate::core::{Event, State, StateHistory};
use crate::error::MachineError;
use crate::global::GlobalData;
use crate::snapshot::{MachineSnapshot, SNAPSHOT_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Created,
    Running,
    ShutDown,
}

/// Outcome of [`StateMachine::run`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RunSummary<S: State> {
    /// Active leaves when the machine finished
    pub final_configuration: Vec<S>,
    pub stats: MachineStats,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

/// A running instance of a [`MachineDefinition`].
///
/// All hooks, reactions and behaviors run on the thread driving the
/// machine, one event at a time. Other threads talk to it only through
/// [`EventSender`]s.
///
/// # Example
///
/// ```rust
/// use orthostate::builder::{MachineBuilder, RegionDef, StateDef};
/// use orthostate::core::Event;
/// use orthostate::{state_enum, StateMachine};
///
/// state_enum! {
///     enum Door {
///         Closed,
///         Open,
///         Removed,
///     }
///     final: [Removed]
/// }
///
/// let definition = MachineBuilder::new()
///     .region(RegionDef::new("door", Door::Closed).states([Door::Open, Door::Removed]))
///     .state(StateDef::new(Door::Closed).on("push", Door::Open))
///     .state(StateDef::new(Door::Open).on("unhinge", Door::Removed))
///     .build()
///     .unwrap();
///
/// let mut machine = StateMachine::new(definition);
/// machine.start();
/// machine.post_event(Event::new("push")).unwrap();
/// machine.post_event(Event::new("unhinge")).unwrap();
/// machine.process_pending();
///
/// assert_eq!(machine.active_configuration(), vec![Door::Removed]);
/// assert!(machine.is_finished());
/// ```
pub struct StateMachine<S: State> {
    engine: Engine<S>,
    queue: EventQueue,
    id: Uuid,
    started_at: Option<DateTime<Utc>>,
    status: Status,
}

impl<S: State> StateMachine<S> {
    pub fn new(definition: impl Into<Arc<MachineDefinition<S>>>) -> Self {
        Self::with_config(definition, MachineConfig::default())
    }

    pub fn with_config(definition: impl Into<Arc<MachineDefinition<S>>>, config: MachineConfig) -> Self {
        let queue = EventQueue::new();
        let engine = Engine::new(definition.into(), config, queue.sender());
        Self {
            engine,
            queue,
            id: Uuid::new_v4(),
            started_at: None,
            status: Status::Created,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.engine.config.name
    }

    pub fn config(&self) -> &MachineConfig {
        &self.engine.config
    }

    pub fn definition(&self) -> &MachineDefinition<S> {
        &self.engine.definition
    }

    /// A cloneable handle other threads can post through.
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Enqueue an event; it is dispatched by a later `step`, `process_pending`
    /// or `run`.
    pub fn post_event(&self, event: Event) -> Result<(), MachineError> {
        self.queue.sender().post(event)
    }

    /// Enter every root region's initial state. Does nothing once started.
    pub fn start(&mut self) {
        if self.status != Status::Created {
            return;
        }
        self.started_at = Some(Utc::now());
        self.status = Status::Running;
        tracing::info!(machine = %self.engine.config.name, id = %self.id, "state machine starting");
        self.engine.enter_roots();
    }

    /// Dispatch at most one queued event, starting the machine if needed.
    pub fn step(&mut self) -> Option<DispatchReport<S>> {
        if self.status == Status::ShutDown {
            return None;
        }
        self.start();
        let event = self.queue.try_next()?;
        Some(self.engine.dispatch(&event))
    }

    /// Dispatch until the queue is empty or the machine finishes, including
    /// events posted while draining.
    pub fn process_pending(&mut self) -> Vec<DispatchReport<S>> {
        let mut reports = Vec::new();
        while !self.is_finished() {
            match self.step() {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }

    /// Dispatch events as they arrive until the machine finishes, then tear
    /// it down.
    ///
    /// Waits on the queue, so completions posted by client tasks and other
    /// threads drive the machine.
    pub async fn run(&mut self) -> Result<RunSummary<S>, MachineError> {
        if self.status == Status::ShutDown {
            return Err(MachineError::Finished);
        }
        self.start();
        while !self.engine.is_finished() {
            let Some(event) = self.queue.next().await else {
                break;
            };
            self.engine.dispatch(&event);
        }

        let summary = RunSummary {
            final_configuration: self.active_configuration(),
            stats: self.engine.stats.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            machine = %self.engine.config.name,
            events = summary.stats.events_dispatched,
            transitions = summary.stats.transitions,
            "state machine finished"
        );
        self.shutdown();
        Ok(summary)
    }

    /// Exit every active state bottom-up, shut clients down and close the
    /// queue. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.status == Status::ShutDown {
            return;
        }
        self.engine.teardown();
        self.queue.close();
        self.status = Status::ShutDown;
        tracing::info!(machine = %self.engine.config.name, "state machine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Every root region sits in a final state.
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    /// Current leaves, depth-first in region declaration order.
    ///
    /// A state that terminated itself stays current in its region until a
    /// transition replaces it, so it is still listed here. Use
    /// [`StateMachine::running_configuration`] to leave those out.
    pub fn active_configuration(&self) -> Vec<S> {
        self.leaves_where(|_| true)
    }

    /// Current leaves that have not terminated themselves.
    pub fn running_configuration(&self) -> Vec<S> {
        self.leaves_where(|node| node.is_active())
    }

    fn leaves_where(&self, keep: impl Fn(&Node<S>) -> bool) -> Vec<S> {
        self.engine
            .arena
            .leaves()
            .into_iter()
            .filter_map(|id| self.engine.arena.node(id))
            .filter(|node| keep(node))
            .map(|node| node.state.clone())
            .collect()
    }

    /// Every active state, parents before children.
    pub fn active_states(&self) -> Vec<ActiveState<S>> {
        self.engine.arena.active_states()
    }

    pub fn is_active(&self, state: &S) -> bool {
        self.engine.contains_state(state)
    }

    /// The machine's instance of `C`, created on first use.
    pub fn get_or_create_client<C: Client>(&mut self) -> Result<&mut C, MachineError> {
        let engine = &mut self.engine;
        engine
            .clients
            .get_or_create::<C>(&engine.config, &engine.sender)
    }

    pub fn client<C: Client>(&self) -> Option<&C> {
        self.engine.clients.get::<C>()
    }

    pub fn client_mut<C: Client>(&mut self) -> Option<&mut C> {
        self.engine.clients.get_mut::<C>()
    }

    /// Clients referenced by the behaviors currently bound to `region`.
    pub fn region_clients(&self, region: &str) -> Vec<ClientId> {
        self.engine
            .arena
            .find_region(region)
            .and_then(|id| self.engine.arena.region(id))
            .map(|r| r.clients_in_use.clone())
            .unwrap_or_default()
    }

    pub fn global_data(&self) -> &GlobalData {
        &self.engine.global
    }

    pub fn global_data_mut(&mut self) -> &mut GlobalData {
        &mut self.engine.global
    }

    pub fn get_global_data<T: Any>(&self, key: &str) -> Option<&T> {
        self.engine.global.get(key)
    }

    pub fn set_global_data<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.engine.global.set(key, value);
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.engine.history
    }

    pub fn stats(&self) -> &MachineStats {
        &self.engine.stats
    }

    /// Exactly one current state per live region, and nothing left over.
    pub fn check_invariants(&self) -> Result<(), MachineError> {
        self.engine.check_invariants()
    }

    /// Serializable view of the machine for diagnostics.
    pub fn snapshot(&self) -> MachineSnapshot<S> {
        MachineSnapshot {
            version: SNAPSHOT_VERSION,
            machine_id: self.id,
            name: self.engine.config.name.clone(),
            taken_at: Utc::now(),
            started_at: self.started_at,
            active: self.active_states(),
            history: self.engine.history.clone(),
            clients: self
                .engine
                .clients
                .ids()
                .iter()
                .map(|id| id.name().to_string())
                .collect(),
            global_keys: self.engine.global.keys(),
            stats: self.engine.stats.clone(),
        }
    }
}

impl<S: State> Drop for StateMachine<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: State> std::fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.engine.config.name)
            .field("id", &self.id)
            .field("status", &self.status)
            .field("active", &self.active_configuration())
            .finish()
    }
}
