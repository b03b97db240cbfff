//! Orthogonal region declarations.

use crate::client::{Client, ClientId};
use crate::core::State;

/// Declaration of an orthogonal region: a parallel sub-machine with its
/// own initial state, member states and optional backing client.
///
/// Region names are unique across a machine; behaviors address regions by
/// name.
///
/// # Example
///
/// ```rust
/// use orthostate::builder::RegionDef;
/// use orthostate::client::TimerClient;
/// use orthostate::state_enum;
///
/// state_enum! {
///     enum Bot {
///         Idle,
///         Waiting,
///     }
/// }
///
/// let region = RegionDef::new("timer", Bot::Idle)
///     .state(Bot::Waiting)
///     .with_client::<TimerClient>();
///
/// assert_eq!(region.name(), "timer");
/// assert_eq!(region.members(), &[Bot::Idle, Bot::Waiting]);
/// ```
#[derive(Clone, Debug)]
pub struct RegionDef<S: State> {
    pub(crate) name: String,
    pub(crate) initial: S,
    pub(crate) states: Vec<S>,
    pub(crate) client: Option<ClientId>,
}

impl<S: State> RegionDef<S> {
    /// Declare a region; `initial` is its first member.
    pub fn new(name: impl Into<String>, initial: S) -> Self {
        Self {
            name: name.into(),
            states: vec![initial.clone()],
            initial,
            client: None,
        }
    }

    /// Add a member state.
    pub fn state(mut self, state: S) -> Self {
        if !self.states.contains(&state) {
            self.states.push(state);
        }
        self
    }

    /// Add several member states.
    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        for state in states {
            self = self.state(state);
        }
        self
    }

    /// Back the region with client `C`; behaviors configured on this
    /// region must drive a `C`.
    pub fn with_client<C: Client>(mut self) -> Self {
        self.client = Some(ClientId::of::<C>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &S {
        &self.initial
    }

    pub fn members(&self) -> &[S] {
        &self.states
    }

    pub fn client(&self) -> Option<ClientId> {
        self.client
    }
}
