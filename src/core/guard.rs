//! Guard predicates for table transitions.
//!
//! A guard is a pure predicate over the incoming event. A table rule whose
//! guard rejects the event behaves as if the rule did not exist.

use super::event::Event;
use std::fmt;
use std::sync::Arc;

/// Pure predicate that determines if a table transition can fire.
///
/// # Example
///
/// ```rust
/// use orthostate::core::{Event, Guard};
///
/// let only_far = Guard::new(|event: &Event| {
///     event.payload_as::<f64>().is_some_and(|distance| distance > 2.0)
/// });
///
/// assert!(only_far.check(&Event::new("moved").with_payload(3.0.into())));
/// assert!(!only_far.check(&Event::new("moved").with_payload(1.0.into())));
/// assert!(!only_far.check(&Event::new("moved")));
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows the transition for this event.
    pub fn check(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn guard_allows_matching_events() {
        let guard = Guard::new(|e: &Event| e.kind().as_str() == "go");

        assert!(guard.check(&Event::new("go")));
        assert!(!guard.check(&Event::new("stop")));
    }

    #[test]
    fn guard_can_inspect_payload() {
        let guard = Guard::new(|e: &Event| e.payload_as::<u32>() == Some(20));

        assert!(guard.check(&Event::new("loop").with_payload(json!(20))));
        assert!(!guard.check(&Event::new("loop").with_payload(json!(3))));
    }

    #[test]
    fn guard_is_deterministic() {
        let event = Event::new("tick");
        let guard = Guard::new(|e: &Event| e.payload().is_none());

        assert_eq!(guard.check(&event), guard.check(&event));
    }

    #[test]
    fn cloned_guards_share_the_predicate() {
        let guard = Guard::new(|e: &Event| e.kind().as_str().starts_with("ev"));
        let cloned = guard.clone();

        assert!(cloned.check(&Event::new("ev_done")));
        assert!(!cloned.check(&Event::new("done")));
    }
}
