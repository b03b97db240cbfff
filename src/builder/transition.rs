//! Static transition table rules.

use crate::client::{Client, ClientId};
use crate::core::{Event, EventKind, Guard, State};

/// One row of a state's transition table: `event kind → target`.
///
/// Rules are evaluated in declaration order; the first rule whose kind
/// matches, whose source client (if set) posted the event and whose guard
/// (if any) accepts the event fires.
#[derive(Clone, Debug)]
pub struct TransitionRule<S: State> {
    pub(crate) event: EventKind,
    pub(crate) target: S,
    pub(crate) source: Option<ClientId>,
    pub(crate) guard: Option<Guard>,
    pub(crate) tag: Option<String>,
}

impl<S: State> TransitionRule<S> {
    pub fn new(event: impl Into<EventKind>, target: S) -> Self {
        Self {
            event: event.into(),
            target,
            source: None,
            guard: None,
            tag: None,
        }
    }

    /// Only match events posted by client `C`.
    pub fn from_client<C: Client>(mut self) -> Self {
        self.source = Some(ClientId::of::<C>());
        self
    }

    /// Add a guard predicate.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Label the rule, e.g. `SUCCESS` or `ABORT`. Tags show up in history.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn event(&self) -> &EventKind {
        &self.event
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn source(&self) -> Option<ClientId> {
        self.source
    }

    /// Check if this rule fires for `event` (pure).
    pub fn matches(&self, event: &Event) -> bool {
        if *event.kind() != self.event {
            return false;
        }
        if self.source.is_some() && event.source() != self.source {
            return false;
        }
        self.guard.as_ref().map_or(true, |g| g.check(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Forward,
        Rotate,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Forward => "Forward",
                Self::Rotate => "Rotate",
            }
        }
    }

    #[test]
    fn matches_on_event_kind() {
        let rule = TransitionRule::new("finished", TestState::Rotate);

        assert!(rule.matches(&Event::new("finished")));
        assert!(!rule.matches(&Event::new("aborted")));
        assert_eq!(rule.target(), &TestState::Rotate);
    }

    #[test]
    fn guard_can_block_a_matching_kind() {
        let rule = TransitionRule::new("loop_end", TestState::Forward)
            .when(|e| e.payload_as::<u32>().is_some_and(|n| n >= 3));

        assert!(!rule.matches(&Event::new("loop_end").with_payload(json!(1))));
        assert!(rule.matches(&Event::new("loop_end").with_payload(json!(3))));
        assert!(!rule.matches(&Event::new("other").with_payload(json!(3))));
    }

    struct Gripper;

    impl Client for Gripper {
        const NAME: &'static str = "gripper";
        type Goal = ();

        fn initialize(
            _params: crate::config::ClientParams<'_>,
            _notifier: crate::client::CompletionNotifier,
        ) -> Result<Self, crate::error::ClientError> {
            Ok(Gripper)
        }

        fn send_request(&mut self, _goal: ()) -> Result<(), crate::error::ClientError> {
            Ok(())
        }
    }

    #[test]
    fn source_filter_requires_the_posting_client() {
        let rule = TransitionRule::new("succeeded", TestState::Rotate).from_client::<Gripper>();
        let gripper = ClientId::of::<Gripper>();

        assert_eq!(rule.source(), Some(gripper));
        assert!(rule.matches(&Event::succeeded(gripper)));
        assert!(!rule.matches(&Event::new("succeeded")));
        assert!(!rule.matches(&Event::succeeded(ClientId::new::<u8>("other"))));
    }

    #[test]
    fn tags_are_kept() {
        let rule = TransitionRule::new("succeeded", TestState::Rotate).tag("SUCCESS");
        assert_eq!(rule.tag_name(), Some("SUCCESS"));
        assert_eq!(rule.event().as_str(), "succeeded");
    }
}
