//! Client behaviors: per-activation strategies bound to a region's client.

use super::{Client, ClientId, ClientRegistry};
use crate::config::MachineConfig;
use crate::core::Event;
use crate::error::{BehaviorError, MachineError};
use crate::global::GlobalData;
use crate::runtime::EventSender;
use std::marker::PhantomData;

/// What a behavior can reach while one of its hooks runs.
pub struct BehaviorContext<'a> {
    client: ClientId,
    sender: &'a EventSender,
    global: &'a mut GlobalData,
}

impl<'a> BehaviorContext<'a> {
    pub fn client_id(&self) -> ClientId {
        self.client
    }

    /// Queue an event. It is dispatched after the current one completes.
    pub fn post(&self, event: Event) {
        if let Err(e) = self.sender.post(event) {
            tracing::warn!(client = self.client.name(), error = %e, "behavior could not post event");
        }
    }

    pub fn global(&self) -> &GlobalData {
        self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalData {
        self.global
    }
}

/// A transient strategy bound to one client for one state activation.
///
/// Created when the owning state enters, released when it exits. `on_exit`
/// runs exactly once, even if `on_entry` failed, and must tolerate that.
pub trait ClientBehavior: Send + 'static {
    /// The client type this behavior drives.
    type Client: Client;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Typically issues one asynchronous request against the client.
    fn on_entry(
        &mut self,
        client: &mut Self::Client,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<(), BehaviorError>;

    /// Typically cancels the request issued on entry.
    fn on_exit(&mut self, _client: &mut Self::Client, _ctx: &mut BehaviorContext<'_>) {}
}

/// Sends a fixed goal on entry and cancels it on exit.
///
/// ```rust
/// use orthostate::client::{SendGoal, TimerClient, TimerGoal};
///
/// let behavior = SendGoal::<TimerClient>::new(TimerGoal::ticks(3));
/// ```
pub struct SendGoal<C: Client> {
    goal: C::Goal,
    sent: bool,
    _client: PhantomData<fn() -> C>,
}

impl<C: Client> SendGoal<C> {
    pub fn new(goal: C::Goal) -> Self {
        Self {
            goal,
            sent: false,
            _client: PhantomData,
        }
    }
}

impl<C: Client> ClientBehavior for SendGoal<C>
where
    C::Goal: Clone,
{
    type Client = C;

    fn name(&self) -> &'static str {
        "send_goal"
    }

    fn on_entry(
        &mut self,
        client: &mut C,
        _ctx: &mut BehaviorContext<'_>,
    ) -> Result<(), BehaviorError> {
        client.send_request(self.goal.clone())?;
        self.sent = true;
        Ok(())
    }

    fn on_exit(&mut self, client: &mut C, _ctx: &mut BehaviorContext<'_>) {
        if std::mem::take(&mut self.sent) {
            client.cancel();
        }
    }
}

/// Borrowed machine parts a behavior hook needs.
pub(crate) struct BehaviorEnv<'a> {
    pub clients: &'a mut ClientRegistry,
    pub config: &'a MachineConfig,
    pub sender: &'a EventSender,
    pub global: &'a mut GlobalData,
}

/// Object-safe view of a [`ClientBehavior`] with its client type erased.
pub(crate) trait ErasedBehavior: Send {
    fn name(&self) -> &'static str;
    fn client(&self) -> ClientId;
    fn enter(&mut self, env: BehaviorEnv<'_>) -> Result<(), MachineError>;
    fn exit(&mut self, env: BehaviorEnv<'_>);
}

struct Erased<B>(B);

impl<B: ClientBehavior> ErasedBehavior for Erased<B> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn client(&self) -> ClientId {
        ClientId::of::<B::Client>()
    }

    fn enter(&mut self, env: BehaviorEnv<'_>) -> Result<(), MachineError> {
        let behavior = self.0.name();
        let client = env
            .clients
            .get_or_create::<B::Client>(env.config, env.sender)?;
        let mut ctx = BehaviorContext {
            client: ClientId::of::<B::Client>(),
            sender: env.sender,
            global: env.global,
        };
        self.0
            .on_entry(client, &mut ctx)
            .map_err(|source| MachineError::BehaviorFailed { behavior, source })
    }

    fn exit(&mut self, env: BehaviorEnv<'_>) {
        let Some(client) = env.clients.get_mut::<B::Client>() else {
            tracing::debug!(
                behavior = self.0.name(),
                client = <B::Client as Client>::NAME,
                "client gone before behavior exit"
            );
            return;
        };
        let mut ctx = BehaviorContext {
            client: ClientId::of::<B::Client>(),
            sender: env.sender,
            global: env.global,
        };
        self.0.on_exit(client, &mut ctx);
    }
}

pub(crate) fn erase<B: ClientBehavior>(behavior: B) -> Box<dyn ErasedBehavior> {
    Box::new(Erased(behavior))
}
