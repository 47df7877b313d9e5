//! Allow-list entries.

use crate::core::{Guard, State};

/// An allowed `from -> to` move, optionally gated by a guard.
#[derive(Clone, Debug)]
pub struct Transition<S: State> {
    pub from: S,
    pub to: S,
    pub guard: Option<Guard<S>>,
}

impl<S: State> Transition<S> {
    pub fn new(from: S, to: S) -> Self {
        Self {
            from,
            to,
            guard: None,
        }
    }

    pub fn guarded(from: S, to: S, guard: Guard<S>) -> Self {
        Self {
            from,
            to,
            guard: Some(guard),
        }
    }

    /// Whether this entry covers the move `from -> to`.
    pub fn matches(&self, from: &S, to: &S) -> bool {
        self.from == *from && self.to == *to
    }

    /// Evaluate the guard, if any, against the current state.
    pub fn guard_allows(&self, current: &S) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
    enum TestState {
        Start,
        Middle,
        End,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Start => "Start",
                Self::Middle => "Middle",
                Self::End => "End",
            }
        }

        fn is_final(&self) -> bool {
            matches!(self, Self::End)
        }
    }

    #[test]
    fn matches_exact_pair_only() {
        let transition = Transition::new(TestState::Start, TestState::Middle);

        assert!(transition.matches(&TestState::Start, &TestState::Middle));
        assert!(!transition.matches(&TestState::Middle, &TestState::Start));
        assert!(!transition.matches(&TestState::Start, &TestState::End));
    }

    #[test]
    fn unguarded_transition_always_allowed() {
        let transition = Transition::new(TestState::Start, TestState::Middle);
        assert!(transition.guard_allows(&TestState::Start));
    }

    #[test]
    fn guard_is_consulted() {
        let transition = Transition::guarded(
            TestState::End,
            TestState::Start,
            Guard::new(|s: &TestState| !s.is_final()),
        );

        assert!(!transition.guard_allows(&TestState::End));
    }
}
