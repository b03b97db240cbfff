//! Transition history tracking.
//!
//! Every state entry performed by the dispatcher is recorded with the region
//! it happened in, the event that caused it and the tag of the table rule.

use super::event::EventKind;
use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state entry.
///
/// `from` is `None` when a region was seeded with its initial state.
///
/// # Example
///
/// ```rust
/// use orthostate::core::{EventKind, State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Step {
///     Forward,
///     Rotate,
/// }
///
/// impl State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::Forward => "Forward",
///             Self::Rotate => "Rotate",
///         }
///     }
/// }
///
/// let transition = StateTransition {
///     region: "main".to_string(),
///     from: Some(Step::Forward),
///     to: Step::Rotate,
///     event: Some(EventKind::new("succeeded")),
///     tag: Some("SUCCESS".to_string()),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to, Step::Rotate);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// Name of the region the entry happened in
    pub region: String,
    /// The state being left, `None` for an initial entry
    pub from: Option<S>,
    /// The state being entered
    pub to: S,
    /// The event that triggered the transition
    pub event: Option<EventKind>,
    /// Tag of the table rule that fired
    pub tag: Option<String>,
    /// When the entry occurred
    pub timestamp: DateTime<Utc>,
}

/// Ordered, optionally bounded, history of state entries.
///
/// When a limit is set the oldest records are evicted first.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
    limit: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            limit: None,
        }
    }

    /// Create a history keeping at most `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Record a transition, evicting the oldest record when full.
    pub fn record(&mut self, transition: StateTransition<S>) {
        self.transitions.push(transition);
        if let Some(limit) = self.limit {
            if self.transitions.len() > limit {
                let excess = self.transitions.len() - limit;
                self.transitions.drain(..excess);
            }
        }
    }

    /// Get the path of states traversed, across all regions.
    ///
    /// Returns the `from` state of the first record (if any), then the `to`
    /// state of each record.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        if let Some(from) = self.transitions.first().and_then(|t| t.from.as_ref()) {
            path.push(from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// States entered in one region, in order.
    pub fn path_in(&self, region: &str) -> Vec<&S> {
        self.transitions
            .iter()
            .filter(|t| t.region == region)
            .map(|t| &t.to)
            .collect()
    }

    /// Calculate total duration from first to last record.
    ///
    /// Returns `None` if there are no records.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all records in order.
    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Initial,
        Processing,
        Complete,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
                Self::Complete => "Complete",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::Complete)
        }
    }

    fn entry(region: &str, from: Option<TestState>, to: TestState) -> StateTransition<TestState> {
        StateTransition {
            region: region.to_string(),
            from,
            to,
            event: None,
            tag: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history: StateHistory<TestState> = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let mut history = StateHistory::new();
        history.record(entry("main", None, TestState::Initial));
        history.record(entry(
            "main",
            Some(TestState::Initial),
            TestState::Processing,
        ));
        history.record(entry(
            "main",
            Some(TestState::Processing),
            TestState::Complete,
        ));

        let path = history.get_path();
        assert_eq!(
            path,
            vec![
                &TestState::Initial,
                &TestState::Processing,
                &TestState::Complete
            ]
        );
    }

    #[test]
    fn path_in_filters_by_region() {
        let mut history = StateHistory::new();
        history.record(entry("nav", None, TestState::Initial));
        history.record(entry("tool", None, TestState::Processing));
        history.record(entry("nav", Some(TestState::Initial), TestState::Complete));

        assert_eq!(
            history.path_in("nav"),
            vec![&TestState::Initial, &TestState::Complete]
        );
        assert_eq!(history.path_in("tool"), vec![&TestState::Processing]);
        assert!(history.path_in("missing").is_empty());
    }

    #[test]
    fn limit_evicts_oldest_records() {
        let mut history = StateHistory::with_limit(2);
        history.record(entry("main", None, TestState::Initial));
        history.record(entry("main", None, TestState::Processing));
        history.record(entry("main", None, TestState::Complete));

        assert_eq!(history.len(), 2);
        assert_eq!(history.transitions()[0].to, TestState::Processing);
        assert_eq!(history.transitions()[1].to, TestState::Complete);
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let mut history = StateHistory::new();
        history.record(entry("main", None, TestState::Initial));

        std::thread::sleep(Duration::from_millis(10));

        history.record(entry("main", None, TestState::Processing));

        let duration = history.duration();
        assert!(duration.is_some());
        assert!(duration.unwrap() >= Duration::from_millis(10));
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = StateHistory::with_limit(8);
        history.record(StateTransition {
            region: "main".to_string(),
            from: Some(TestState::Initial),
            to: TestState::Processing,
            event: Some(EventKind::new("go")),
            tag: Some("SUCCESS".to_string()),
            timestamp: Utc::now(),
        });

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<TestState> = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.len(), 1);
        assert_eq!(
            deserialized.transitions()[0].event,
            Some(EventKind::new("go"))
        );
    }
}
