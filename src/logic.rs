//! Logic units: event-to-event mappers owned by a state.
//!
//! Every live unit of every active state sees each dispatched event before
//! any state reacts to it. A unit may answer with a derived event, which is
//! queued behind the events already waiting.

use crate::core::{Event, EventKind};
use std::collections::HashSet;

pub trait LogicUnit: Send + 'static {
    /// Observe `event`, optionally producing an event to post.
    fn notify(&mut self, event: &Event) -> Option<Event>;
}

/// Posts `target` every time an event of kind `source` is seen.
///
/// ```rust
/// use orthostate::core::Event;
/// use orthostate::logic::{LogicUnit, Relay};
///
/// let mut relay = Relay::new("timer_tick", "take_sample");
/// let derived = relay.notify(&Event::new("timer_tick")).unwrap();
/// assert_eq!(derived.kind().as_str(), "take_sample");
/// assert!(relay.notify(&Event::new("other")).is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Relay {
    source: EventKind,
    target: EventKind,
}

impl Relay {
    pub fn new(source: impl Into<EventKind>, target: impl Into<EventKind>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl LogicUnit for Relay {
    fn notify(&mut self, event: &Event) -> Option<Event> {
        event
            .is(&self.source)
            .then(|| Event::new(self.target.clone()))
    }
}

/// Posts `target` once, after every kind in `sources` has been seen at
/// least once, in any order.
#[derive(Clone, Debug)]
pub struct AllOf {
    sources: Vec<EventKind>,
    seen: HashSet<EventKind>,
    target: EventKind,
    fired: bool,
}

impl AllOf {
    pub fn new<I, K>(sources: I, target: impl Into<EventKind>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<EventKind>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            seen: HashSet::new(),
            target: target.into(),
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl LogicUnit for AllOf {
    fn notify(&mut self, event: &Event) -> Option<Event> {
        if self.fired || !self.sources.contains(event.kind()) {
            return None;
        }
        self.seen.insert(event.kind().clone());
        if self.sources.iter().all(|kind| self.seen.contains(kind)) {
            self.fired = true;
            return Some(Event::new(self.target.clone()));
        }
        None
    }
}
