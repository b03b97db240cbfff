//! Events flowing through the machine queue.
//!
//! An event is an immutable value with a stable kind, an optional tag naming
//! the client that produced it and an optional JSON payload. Events are
//! cheap to clone and `Send`, so they can be posted from client worker
//! threads.

use crate::client::ClientId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Type identity of an event.
///
/// Transition tables, custom reactions and logic units all match on the
/// kind. Kinds compare by name.
///
/// # Example
///
/// ```rust
/// use orthostate::core::EventKind;
///
/// const FINISHED: EventKind = EventKind::from_static("finished");
///
/// assert_eq!(FINISHED, EventKind::new("finished"));
/// assert_eq!(FINISHED.as_str(), "finished");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKind(Cow<'static, str>);

impl EventKind {
    /// Create a kind usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&EventKind> for EventKind {
    fn from(kind: &EventKind) -> Self {
        kind.clone()
    }
}

/// Posted by a client when its outstanding request completed successfully.
pub const SUCCEEDED: EventKind = EventKind::from_static("succeeded");

/// Posted by a client when its outstanding request was aborted.
pub const ABORTED: EventKind = EventKind::from_static("aborted");

/// Outcome carried by a client completion event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Aborted,
}

/// A message posted into the machine.
#[derive(Clone, Debug)]
pub struct Event {
    kind: EventKind,
    source: Option<ClientId>,
    payload: Option<serde_json::Value>,
}

impl Event {
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            kind: kind.into(),
            source: None,
            payload: None,
        }
    }

    /// Completion event for a successful request of `client`.
    pub fn succeeded(client: ClientId) -> Self {
        Self::new(SUCCEEDED).from_client(client)
    }

    /// Completion event for an aborted request of `client`.
    pub fn aborted(client: ClientId) -> Self {
        Self::new(ABORTED).from_client(client)
    }

    /// Tag the event with the client that produced it.
    pub fn from_client(mut self, client: ClientId) -> Self {
        self.source = Some(client);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a serializable payload.
    pub fn with_data<T: Serialize>(self, data: &T) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(data)?;
        Ok(self.with_payload(value))
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn is(&self, kind: &EventKind) -> bool {
        self.kind == *kind
    }

    pub fn source(&self) -> Option<ClientId> {
        self.source
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// Decode the payload, returning `None` when absent or of another shape.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Completion outcome, if this is a client completion event.
    pub fn completion(&self) -> Option<Completion> {
        self.source?;
        if self.kind == SUCCEEDED {
            Some(Completion::Succeeded)
        } else if self.kind == ABORTED {
            Some(Completion::Aborted)
        } else {
            None
        }
    }

    /// Completion outcome if this event was produced by `client`.
    ///
    /// Returns `None` for completions tagged with any other client, which is
    /// how a state recognizes events meant for a sibling region.
    pub fn completion_from(&self, client: ClientId) -> Option<Completion> {
        if self.source != Some(client) {
            return None;
        }
        self.completion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Navigation;
    struct Gripper;

    fn navigation() -> ClientId {
        ClientId::new::<Navigation>("navigation")
    }

    fn gripper() -> ClientId {
        ClientId::new::<Gripper>("gripper")
    }

    #[test]
    fn kinds_compare_by_name() {
        assert_eq!(EventKind::from_static("a"), EventKind::new("a".to_string()));
        assert_ne!(EventKind::from_static("a"), EventKind::from_static("b"));
        assert_eq!(EventKind::from("a").to_string(), "a");
    }

    #[test]
    fn plain_events_are_not_completions() {
        let event = Event::new("finished");
        assert!(event.is(&EventKind::from_static("finished")));
        assert!(event.source().is_none());
        assert_eq!(event.completion(), None);
    }

    #[test]
    fn untagged_succeeded_is_not_a_completion() {
        assert_eq!(Event::new(SUCCEEDED).completion(), None);
    }

    #[test]
    fn completion_from_matches_only_the_tagged_client() {
        let event = Event::aborted(navigation());

        assert_eq!(event.completion(), Some(Completion::Aborted));
        assert_eq!(
            event.completion_from(navigation()),
            Some(Completion::Aborted)
        );
        assert_eq!(event.completion_from(gripper()), None);
        assert_eq!(
            Event::succeeded(gripper()).completion_from(gripper()),
            Some(Completion::Succeeded)
        );
    }

    #[test]
    fn payload_decodes_into_typed_values() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Pose {
            x: f64,
            y: f64,
        }

        let event = Event::new("pose")
            .with_data(&Pose { x: 1.0, y: 2.5 })
            .unwrap();

        assert_eq!(event.payload(), Some(&json!({ "x": 1.0, "y": 2.5 })));
        assert_eq!(event.payload_as::<Pose>(), Some(Pose { x: 1.0, y: 2.5 }));
        assert_eq!(event.payload_as::<String>(), None);
    }
}
