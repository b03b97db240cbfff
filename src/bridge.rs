//! Bridging long-running client requests into events.
//!
//! An [`OperationState`] issues one request when its state is entered and
//! turns the client's completion into machine events: success posts a
//! "finished" event, an abort re-issues the same goal.

use crate::builder::StateDef;
use crate::client::{Client, ClientId};
use crate::core::{Completion, Event, EventKind, State, ABORTED, SUCCEEDED};
use crate::runtime::{Reaction, StateContext, StateHandler};
use std::marker::PhantomData;

/// What an operation state does after posting its finished event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// Exit in place; the finished event drives the next transition.
    #[default]
    Terminate,
    /// Stay active and let ancestors see the completion too.
    Forward,
}

/// Handler that drives one request of client `C` per activation.
///
/// Completions tagged with another client are forwarded untouched, so
/// sibling regions driving other clients never trigger each other's
/// retries. Aborts are retried without limit.
///
/// # Example
///
/// ```rust
/// use orthostate::bridge::OperationState;
/// use orthostate::builder::StateDef;
/// use orthostate::client::{TimerClient, TimerGoal};
/// use orthostate::state_enum;
///
/// state_enum! {
///     enum Bot {
///         Wait,
///         Go,
///     }
/// }
///
/// let wait = StateDef::new(Bot::Wait)
///     .operation(OperationState::<TimerClient>::new(TimerGoal::ticks(2)).finishing_with("waited"))
///     .on("waited", Bot::Go);
/// ```
pub struct OperationState<C: Client> {
    goal: C::Goal,
    finished: Option<EventKind>,
    policy: SuccessPolicy,
    pending: bool,
    requests: u32,
    _client: PhantomData<fn() -> C>,
}

impl<C: Client> OperationState<C>
where
    C::Goal: Clone,
{
    pub fn new(goal: C::Goal) -> Self {
        Self {
            goal,
            finished: None,
            policy: SuccessPolicy::default(),
            pending: false,
            requests: 0,
            _client: PhantomData,
        }
    }

    /// Event posted when the request succeeds.
    pub fn finishing_with(mut self, kind: impl Into<EventKind>) -> Self {
        self.finished = Some(kind.into());
        self
    }

    pub fn on_success(mut self, policy: SuccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Requests issued during this activation, retries included.
    pub fn requests_sent(&self) -> u32 {
        self.requests
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn issue<S: State>(&mut self, ctx: &mut StateContext<'_, S>) {
        let client = match ctx.request_client::<C>() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(client = C::NAME, error = %e, "operation not started");
                return;
            }
        };
        match client.send_request(self.goal.clone()) {
            Ok(()) => {
                self.pending = true;
                self.requests += 1;
            }
            Err(e) => {
                tracing::warn!(client = C::NAME, error = %e, "operation request rejected");
            }
        }
    }
}

impl<C: Client> Clone for OperationState<C>
where
    C::Goal: Clone,
{
    fn clone(&self) -> Self {
        Self {
            goal: self.goal.clone(),
            finished: self.finished.clone(),
            policy: self.policy,
            pending: false,
            requests: 0,
            _client: PhantomData,
        }
    }
}

impl<S: State, C: Client> StateHandler<S> for OperationState<C>
where
    C::Goal: Clone,
{
    fn on_entry(&mut self, ctx: &mut StateContext<'_, S>) {
        self.issue(ctx);
    }

    fn react(&mut self, event: &Event, ctx: &mut StateContext<'_, S>) -> Reaction {
        match event.completion_from(ClientId::of::<C>()) {
            None => Reaction::Forward,
            Some(Completion::Succeeded) => {
                self.pending = false;
                if let Some(kind) = &self.finished {
                    ctx.post(Event::new(kind));
                }
                match self.policy {
                    SuccessPolicy::Terminate => Reaction::Terminate,
                    SuccessPolicy::Forward => Reaction::Forward,
                }
            }
            Some(Completion::Aborted) => {
                self.pending = false;
                tracing::warn!(
                    client = C::NAME,
                    state = ctx.state().name(),
                    attempt = self.requests + 1,
                    "operation aborted, retrying"
                );
                self.issue(ctx);
                Reaction::Discard
            }
        }
    }

    fn on_exit(&mut self, ctx: &mut StateContext<'_, S>) {
        if !std::mem::take(&mut self.pending) {
            return;
        }
        if let Some(client) = ctx.existing_client_mut::<C>() {
            client.cancel();
        }
    }
}

impl<S: State> StateDef<S> {
    /// Make this state an operation state for client `C`: it reacts to
    /// `succeeded` and `aborted` with `operation`'s policy.
    pub fn operation<C>(self, operation: OperationState<C>) -> Self
    where
        C: Client,
        C::Goal: Clone + Sync,
    {
        self.react_to(SUCCEEDED)
            .react_to(ABORTED)
            .handler(move || operation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MachineBuilder, RegionDef};
    use crate::client::{ClientParams, CompletionNotifier};
    use crate::config::MachineConfig;
    use crate::error::ClientError;
    use crate::runtime::StateMachine;
    use serde_json::json;

    struct Drill {
        requests: u32,
        cancels: u32,
    }

    impl Client for Drill {
        const NAME: &'static str = "drill";
        type Goal = u32;

        fn initialize(
            params: ClientParams<'_>,
            _notifier: CompletionNotifier,
        ) -> Result<Self, ClientError> {
            params.require::<String>("device")?;
            Ok(Self {
                requests: 0,
                cancels: 0,
            })
        }

        fn send_request(&mut self, _depth: u32) -> Result<(), ClientError> {
            self.requests += 1;
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    crate::state_enum! {
        enum Site {
            Drilling,
            Sampled,
            Aborted,
        }
        final: [Sampled, Aborted]
    }

    fn machine(config: MachineConfig) -> StateMachine<Site> {
        let definition = MachineBuilder::new()
            .region(RegionDef::new("main", Site::Drilling).states([Site::Sampled, Site::Aborted]))
            .state(
                StateDef::new(Site::Drilling)
                    .operation(OperationState::<Drill>::new(30).finishing_with("drilled"))
                    .on("drilled", Site::Sampled)
                    .on("give_up", Site::Aborted),
            )
            .build()
            .unwrap();
        StateMachine::with_config(definition, config)
    }

    fn drill_config() -> MachineConfig {
        MachineConfig::default().with_client("drill", json!({ "device": "/dev/drill0" }))
    }

    #[test]
    fn success_posts_finished_event() {
        let mut machine = machine(drill_config());
        machine.start();
        assert_eq!(machine.client::<Drill>().unwrap().requests, 1);

        machine
            .post_event(Event::succeeded(ClientId::of::<Drill>()))
            .unwrap();
        machine.process_pending();

        assert_eq!(machine.active_configuration(), vec![Site::Sampled]);
        assert_eq!(machine.client::<Drill>().unwrap().cancels, 0);
    }

    #[test]
    fn aborts_reissue_the_goal() {
        let mut machine = machine(drill_config());
        machine.start();

        for _ in 0..3 {
            machine
                .post_event(Event::aborted(ClientId::of::<Drill>()))
                .unwrap();
        }
        let reports = machine.process_pending();

        assert_eq!(reports.len(), 3);
        assert_eq!(machine.client::<Drill>().unwrap().requests, 4);
        assert_eq!(machine.stats().transitions, 0);
        assert_eq!(machine.active_configuration(), vec![Site::Drilling]);
    }

    #[test]
    fn exit_cancels_pending_request() {
        let mut machine = machine(drill_config());
        machine.start();

        machine.post_event(Event::new("give_up")).unwrap();
        machine.process_pending();

        assert_eq!(machine.active_configuration(), vec![Site::Aborted]);
        assert_eq!(machine.client::<Drill>().unwrap().cancels, 1);
    }

    #[test]
    fn missing_client_leaves_state_active() {
        let mut machine = machine(MachineConfig::default());
        machine.start();

        assert_eq!(machine.active_configuration(), vec![Site::Drilling]);
        assert!(machine.client::<Drill>().is_none());
    }

    #[test]
    fn clones_start_fresh() {
        let mut op = OperationState::<Drill>::new(5);
        op.pending = true;
        op.requests = 3;

        let copy = op.clone();
        assert!(!copy.is_pending());
        assert_eq!(copy.requests_sent(), 0);
    }
}
