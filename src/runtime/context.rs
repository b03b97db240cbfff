//! State handlers and the context they run in.

use super::engine::Engine;
use super::region::NodeId;
use super::EventSender;
use crate::client::behavior::erase;
use crate::client::{Client, ClientBehavior};
use crate::config::MachineConfig;
use crate::core::{Event, State};
use crate::error::MachineError;
use crate::global::GlobalData;
use crate::logic::LogicUnit;

/// Outcome of a custom reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// Not handled here: keep looking (table, then ancestors, then
    /// sibling regions).
    Forward,
    /// Handled: nothing else sees the event.
    Discard,
    /// Exit this state in place, then keep looking as if no custom
    /// reaction existed. The state stays current in its region, inert.
    Terminate,
}

/// Per-activation code of a state.
///
/// A fresh handler is created on every entry and dropped on exit, so its
/// fields are per-activation data. `react` is only called for the event
/// kinds the state declared with
/// [`StateDef::react_to`](crate::builder::StateDef::react_to).
///
/// # Example
///
/// ```rust
/// use orthostate::core::{Event, State};
/// use orthostate::runtime::{Reaction, StateContext, StateHandler};
///
/// #[derive(Default)]
/// struct CountTicks {
///     ticks: u32,
/// }
///
/// impl<S: State> StateHandler<S> for CountTicks {
///     fn react(&mut self, _event: &Event, ctx: &mut StateContext<'_, S>) -> Reaction {
///         self.ticks += 1;
///         if self.ticks == 3 {
///             ctx.post(Event::new("enough_ticks"));
///         }
///         Reaction::Discard
///     }
/// }
/// ```
pub trait StateHandler<S: State>: Send + 'static {
    fn on_entry(&mut self, _ctx: &mut StateContext<'_, S>) {}

    fn react(&mut self, _event: &Event, _ctx: &mut StateContext<'_, S>) -> Reaction {
        Reaction::Forward
    }

    fn on_exit(&mut self, _ctx: &mut StateContext<'_, S>) {}
}

/// Handler of states declared without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passive;

impl<S: State> StateHandler<S> for Passive {}

/// What a state handler can reach while one of its hooks runs.
///
/// Transitions are never triggered from here: a handler posts an event and
/// the table (or an ancestor's table) reacts to it after the current
/// dispatch completes.
pub struct StateContext<'a, S: State> {
    pub(crate) engine: &'a mut Engine<S>,
    pub(crate) node: NodeId,
    pub(crate) state: S,
}

impl<'a, S: State> StateContext<'a, S> {
    /// The state whose hook is running.
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Queue an event behind the ones already waiting.
    pub fn post(&self, event: Event) {
        if let Err(e) = self.engine.sender.post(event) {
            tracing::warn!(state = self.state.name(), error = %e, "state could not post event");
        }
    }

    /// A sender that can be moved into worker threads.
    pub fn sender(&self) -> EventSender {
        self.engine.sender.clone()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.engine.config
    }

    pub fn global(&self) -> &GlobalData {
        &self.engine.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalData {
        &mut self.engine.global
    }

    /// Bind `behavior` to the live region called `region` for as long as
    /// this state is active.
    ///
    /// Failures are logged and returned; the state stays active either
    /// way. A behavior whose entry hook failed is still exited.
    pub fn configure<B: ClientBehavior>(
        &mut self,
        region: &str,
        behavior: B,
    ) -> Result<(), MachineError> {
        self.engine.bind_behavior(self.node, region, erase(behavior))
    }

    /// The machine's instance of `C`, created on first use.
    pub fn request_client<C: Client>(&mut self) -> Result<&mut C, MachineError> {
        let engine = &mut *self.engine;
        engine
            .clients
            .get_or_create::<C>(&engine.config, &engine.sender)
    }

    /// The machine's instance of `C` if it was already created.
    pub fn existing_client_mut<C: Client>(&mut self) -> Option<&mut C> {
        self.engine.clients.get_mut::<C>()
    }

    /// Attach a logic unit to this state; it is dropped on exit.
    pub fn create_logic_unit<L: LogicUnit>(&mut self, unit: L) {
        if let Some(node) = self.engine.arena.node_mut(self.node) {
            node.logic_units.push(Box::new(unit));
        }
    }

    /// Whether `state` is part of the active configuration.
    pub fn is_active(&self, state: &S) -> bool {
        self.engine.contains_state(state)
    }
}
