//! Static per-state definitions.

use super::region::RegionDef;
use super::transition::TransitionRule;
use crate::client::behavior::{erase, ErasedBehavior};
use crate::client::{Client, ClientBehavior, ClientId};
use crate::core::{EventKind, State};
use crate::logic::LogicUnit;
use crate::runtime::{Passive, StateHandler};
use std::fmt;
use std::sync::Arc;

pub(crate) type HandlerFactory<S> = Arc<dyn Fn() -> Box<dyn StateHandler<S>> + Send + Sync>;
pub(crate) type BehaviorFactory = Arc<dyn Fn() -> Box<dyn ErasedBehavior> + Send + Sync>;
pub(crate) type LogicFactory = Arc<dyn Fn() -> Box<dyn LogicUnit> + Send + Sync>;

/// A behavior declared on a state, instantiated on every entry.
#[derive(Clone)]
pub(crate) struct StaticBehavior {
    pub region: String,
    pub client: ClientId,
    pub name: &'static str,
    pub factory: BehaviorFactory,
}

/// Everything known about one state before the machine runs: its
/// transition table, custom reactions, handler, nested regions, and the
/// behaviors and logic units created whenever it is entered.
///
/// # Example
///
/// ```rust
/// use orthostate::builder::{RegionDef, StateDef};
/// use orthostate::client::{SendGoal, TimerClient, TimerGoal};
/// use orthostate::state_enum;
///
/// state_enum! {
///     enum Bot {
///         Waiting,
///         Moving,
///         Idle,
///     }
/// }
///
/// let waiting = StateDef::new(Bot::Waiting)
///     .on("timer_done", Bot::Moving)
///     .configure("timer", || SendGoal::<TimerClient>::new(TimerGoal::ticks(3)));
///
/// assert_eq!(waiting.rules().len(), 1);
/// ```
pub struct StateDef<S: State> {
    pub(crate) state: S,
    pub(crate) rules: Vec<TransitionRule<S>>,
    pub(crate) reactions: Vec<EventKind>,
    pub(crate) handler: Option<HandlerFactory<S>>,
    pub(crate) regions: Vec<RegionDef<S>>,
    pub(crate) behaviors: Vec<StaticBehavior>,
    pub(crate) logic_units: Vec<LogicFactory>,
}

impl<S: State> StateDef<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            rules: Vec::new(),
            reactions: Vec::new(),
            handler: None,
            regions: Vec::new(),
            behaviors: Vec::new(),
            logic_units: Vec::new(),
        }
    }

    /// Add an unguarded table row `event → target`.
    pub fn on(self, event: impl Into<EventKind>, target: S) -> Self {
        self.rule(TransitionRule::new(event, target))
    }

    /// Add a table row `event → target` that only fires for events posted
    /// by client `C`, e.g. routing one client's `succeeded` apart from
    /// another's.
    pub fn on_from<C: Client>(self, event: impl Into<EventKind>, target: S) -> Self {
        self.rule(TransitionRule::new(event, target).from_client::<C>())
    }

    /// Add a table row. Rows are tried in the order they were added.
    pub fn rule(mut self, rule: TransitionRule<S>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Route events of `kind` to the handler's `react` before the table
    /// is consulted.
    pub fn react_to(mut self, kind: impl Into<EventKind>) -> Self {
        let kind = kind.into();
        if !self.reactions.contains(&kind) {
            self.reactions.push(kind);
        }
        self
    }

    /// Per-activation handler. A fresh handler is built on every entry.
    pub fn handler<H, F>(mut self, factory: F) -> Self
    where
        H: StateHandler<S>,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(move || Box::new(factory()) as Box<dyn StateHandler<S>>));
        self
    }

    /// Nest an orthogonal region, active while this state is.
    pub fn region(mut self, region: RegionDef<S>) -> Self {
        self.regions.push(region);
        self
    }

    /// Bind a behavior built by `factory` to `region` on every entry.
    ///
    /// Binding happens after the handler's `on_entry` and after nested
    /// regions are seeded, so `region` may be one of this state's own.
    pub fn configure<B, F>(mut self, region: impl Into<String>, factory: F) -> Self
    where
        B: ClientBehavior,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.behaviors.push(StaticBehavior {
            region: region.into(),
            client: ClientId::of::<B::Client>(),
            name: std::any::type_name::<B>(),
            factory: Arc::new(move || erase(factory())),
        });
        self
    }

    /// Create a logic unit on every entry.
    pub fn logic_unit<L, F>(mut self, factory: F) -> Self
    where
        L: LogicUnit,
        F: Fn() -> L + Send + Sync + 'static,
    {
        self.logic_units
            .push(Arc::new(move || Box::new(factory()) as Box<dyn LogicUnit>));
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn rules(&self) -> &[TransitionRule<S>] {
        &self.rules
    }

    pub fn nested_regions(&self) -> &[RegionDef<S>] {
        &self.regions
    }

    /// Whether `kind` is routed to the handler's `react`.
    pub fn reacts_to(&self, kind: &EventKind) -> bool {
        self.reactions.contains(kind)
    }

    pub(crate) fn make_handler(&self) -> Box<dyn StateHandler<S>> {
        match &self.handler {
            Some(factory) => factory(),
            None => Box::new(Passive),
        }
    }
}

impl<S: State> fmt::Debug for StateDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDef")
            .field("state", &self.state)
            .field("rules", &self.rules)
            .field("reactions", &self.reactions)
            .field("regions", &self.regions)
            .field(
                "behaviors",
                &self.behaviors.iter().map(|b| &b.region).collect::<Vec<_>>(),
            )
            .field("logic_units", &self.logic_units.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SendGoal, TimerClient, TimerGoal};
    use crate::core::{Event, ABORTED, SUCCEEDED};
    use crate::logic::Relay;

    crate::state_enum! {
        enum Arm {
            Reach,
            Grasp,
            Lift,
        }
    }

    #[test]
    fn rules_keep_declaration_order() {
        let def = StateDef::new(Arm::Reach)
            .on("reached", Arm::Grasp)
            .rule(TransitionRule::new("reached", Arm::Lift).tag("SKIP"));

        let targets: Vec<&Arm> = def.rules().iter().map(|r| r.target()).collect();
        assert_eq!(targets, vec![&Arm::Grasp, &Arm::Lift]);
        assert!(def.rules()[0].matches(&Event::new("reached")));
    }

    #[test]
    fn reactions_are_deduplicated() {
        let def = StateDef::new(Arm::Grasp)
            .react_to(SUCCEEDED)
            .react_to(ABORTED)
            .react_to(SUCCEEDED);

        assert_eq!(def.reactions.len(), 2);
        assert!(def.reacts_to(&ABORTED));
        assert!(!def.reacts_to(&EventKind::new("timer_tick")));
    }

    #[test]
    fn configure_records_region_and_client() {
        let def = StateDef::new(Arm::Lift)
            .configure("timer", || SendGoal::<TimerClient>::new(TimerGoal::forever()))
            .logic_unit(|| Relay::new("timer_tick", "lift_step"));

        assert_eq!(def.behaviors.len(), 1);
        assert_eq!(def.behaviors[0].region, "timer");
        assert_eq!(def.behaviors[0].client, ClientId::of::<TimerClient>());
        assert_eq!((def.behaviors[0].factory)().name(), "send_goal");
        assert_eq!(def.logic_units.len(), 1);
    }

    #[test]
    fn handler_defaults_to_passive() {
        let def = StateDef::new(Arm::Reach);
        assert!(def.handler.is_none());
        let _handler = def.make_handler();
    }
}
