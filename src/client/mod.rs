//! Clients: long-lived owners of a session with an external resource.
//!
//! A client is created lazily, at most once per type per machine, and
//! reports completions of its requests by posting `succeeded`/`aborted`
//! events tagged with its [`ClientId`]. Client workers never touch machine
//! state directly: their only channel back is the [`CompletionNotifier`].

pub mod behavior;
mod registry;
pub mod timer;

pub use crate::config::ClientParams;
pub use behavior::{BehaviorContext, ClientBehavior, SendGoal};
pub use registry::ClientRegistry;
pub use timer::{TimerClient, TimerGoal, TIMER_TICK};

use crate::core::Event;
use crate::error::{ClientError, MachineError};
use crate::runtime::EventSender;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a client type.
///
/// Completion events carry the id of the client that produced them. Ids
/// compare by the client's Rust type; the name is for logs.
#[derive(Clone, Copy)]
pub struct ClientId {
    name: &'static str,
    type_id: TypeId,
}

impl ClientId {
    /// Identity of the client type `T`, displayed as `name`.
    pub fn new<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
        }
    }

    pub fn of<C: Client>() -> Self {
        Self::new::<C>(C::NAME)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ClientId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClientId {}

impl Hash for ClientId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.name)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Handle a client uses to report results back into the machine.
///
/// Cheap to clone and `Send`, so it can move into worker threads or tokio
/// tasks. Every event posted through it is tagged with the client's id.
#[derive(Clone, Debug)]
pub struct CompletionNotifier {
    client: ClientId,
    sender: EventSender,
}

impl CompletionNotifier {
    pub fn new(client: ClientId, sender: EventSender) -> Self {
        Self { client, sender }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn succeeded(&self) -> Result<(), MachineError> {
        self.sender.post(Event::succeeded(self.client))
    }

    pub fn aborted(&self) -> Result<(), MachineError> {
        self.sender.post(Event::aborted(self.client))
    }

    /// Post any event, tagged with this client.
    pub fn post(&self, event: Event) -> Result<(), MachineError> {
        self.sender.post(event.from_client(self.client))
    }
}

/// A long-lived capability wrapping one external resource.
///
/// # Example
///
/// ```rust
/// use orthostate::client::{Client, ClientParams, CompletionNotifier};
/// use orthostate::ClientError;
///
/// struct Navigation {
///     server: String,
///     notifier: CompletionNotifier,
/// }
///
/// impl Client for Navigation {
///     const NAME: &'static str = "navigation";
///     type Goal = (f64, f64);
///
///     fn initialize(
///         params: ClientParams<'_>,
///         notifier: CompletionNotifier,
///     ) -> Result<Self, ClientError> {
///         let server = params.require::<String>("server")?;
///         Ok(Self { server, notifier })
///     }
///
///     fn send_request(&mut self, _goal: Self::Goal) -> Result<(), ClientError> {
///         // hand the goal to the navigation stack; the result arrives later
///         // through `self.notifier`
///         Ok(())
///     }
/// }
/// ```
pub trait Client: Send + 'static {
    /// Name of the client, also the key of its configuration section.
    const NAME: &'static str;

    /// Request payload accepted by [`Client::send_request`].
    type Goal: Send + 'static;

    /// Create the client. Missing prerequisites are reported as errors,
    /// never panics.
    fn initialize(params: ClientParams<'_>, notifier: CompletionNotifier) -> Result<Self, ClientError>
    where
        Self: Sized;

    /// Issue a request. Must not block: the result is reported later
    /// through the notifier.
    fn send_request(&mut self, goal: Self::Goal) -> Result<(), ClientError>;

    /// Cancel the outstanding request, if the resource supports it.
    fn cancel(&mut self) {}

    /// Release the session. Called once when the machine is torn down.
    fn shutdown(&mut self) {}
}
