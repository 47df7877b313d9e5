//! Transition history kept by each state machine.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
///
/// `sequence` counts the transitions a machine has committed, starting at 1.
/// It keeps increasing when old records are dropped from a bounded history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being left
    pub from: S,
    /// The state being entered
    pub to: S,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
    /// Position of this transition in the machine's lifetime
    pub sequence: u64,
}

/// Ordered history of committed transitions.
///
/// A history may be bounded; once `limit` records are held, recording a new
/// one drops the oldest.
///
/// # Example
///
/// ```rust
/// use lifeline::core::{State, StateHistory, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Step { A, B, C }
///
/// impl State for Step {
///     fn name(&self) -> &str {
///         match self {
///             Self::A => "A",
///             Self::B => "B",
///             Self::C => "C",
///         }
///     }
/// }
///
/// let mut history = StateHistory::with_limit(1);
/// history.record(StateTransition { from: Step::A, to: Step::B, timestamp: Utc::now(), sequence: 1 });
/// history.record(StateTransition { from: Step::B, to: Step::C, timestamp: Utc::now(), sequence: 2 });
///
/// assert_eq!(history.len(), 1);
/// assert_eq!(history.get_path(), vec![&Step::B, &Step::C]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
    #[serde(default)]
    limit: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create an empty, unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            limit: None,
        }
    }

    /// Create an empty history retaining at most `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: Vec::new(),
            limit: Some(limit),
        }
    }

    /// The retention limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub(crate) fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.enforce_limit();
    }

    /// Append a transition, dropping the oldest records past the limit.
    pub fn record(&mut self, transition: StateTransition<S>) {
        self.transitions.push(transition);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            if self.transitions.len() > limit {
                let excess = self.transitions.len() - limit;
                self.transitions.drain(..excess);
            }
        }
    }

    /// States traversed by the retained records: the `from` of the first
    /// record, then the `to` of each record.
    pub fn get_path(&self) -> Vec<&S> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn last(&self) -> Option<&StateTransition<S>> {
        self.transitions.last()
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

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Running,
        Dead,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Running => "Running",
                Self::Dead => "Dead",
            }
        }
    }

    fn record(from: TestState, to: TestState, sequence: u64) -> StateTransition<TestState> {
        StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            sequence,
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history: StateHistory<TestState> = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
        assert!(history.last().is_none());
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let mut history = StateHistory::new();
        history.record(record(TestState::Idle, TestState::Running, 1));
        history.record(record(TestState::Running, TestState::Dead, 2));

        let path = history.get_path();
        assert_eq!(
            path,
            vec![&TestState::Idle, &TestState::Running, &TestState::Dead]
        );
        assert_eq!(history.last().map(|t| t.sequence), Some(2));
    }

    #[test]
    fn limit_drops_oldest_records() {
        let mut history = StateHistory::with_limit(2);
        history.record(record(TestState::Idle, TestState::Running, 1));
        history.record(record(TestState::Running, TestState::Idle, 2));
        history.record(record(TestState::Idle, TestState::Running, 3));

        assert_eq!(history.len(), 2);
        assert_eq!(history.transitions()[0].sequence, 2);
        assert_eq!(history.transitions()[1].sequence, 3);
    }

    #[test]
    fn shrinking_limit_trims_existing_records() {
        let mut history = StateHistory::new();
        for sequence in 1..=4 {
            history.record(record(TestState::Idle, TestState::Running, sequence));
        }

        history.set_limit(Some(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.transitions()[0].sequence, 4);
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let mut history = StateHistory::new();
        history.record(record(TestState::Idle, TestState::Running, 1));

        assert_eq!(history.duration(), Some(Duration::from_secs(0)));
    }

    #[test]
    fn history_serializes_with_limit() {
        let mut history = StateHistory::with_limit(8);
        history.record(record(TestState::Idle, TestState::Running, 1));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory<TestState> = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.len(), 1);
        assert_eq!(deserialized.limit(), Some(8));
    }
}
