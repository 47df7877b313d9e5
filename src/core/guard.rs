//! Guard predicates for gating state transitions.

use super::state::State;
use std::fmt;
use std::sync::Arc;

/// Predicate that decides whether a transition may be committed.
///
/// A guard sees the machine's current state. Anything else it needs
/// (health, cooldowns, flags) has to be captured by the closure.
///
/// # Example
///
/// ```rust
/// use lifeline::core::{Guard, State};
/// use serde::{Deserialize, Serialize};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Closed,
///     Open,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Closed => "Closed",
///             Self::Open => "Open",
///         }
///     }
/// }
///
/// let has_key = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&has_key);
/// let guard = Guard::new(move |_: &Door| flag.load(Ordering::SeqCst));
///
/// assert!(!guard.check(&Door::Closed));
/// has_key.store(true, Ordering::SeqCst);
/// assert!(guard.check(&Door::Closed));
/// ```
pub struct Guard<S: State> {
    predicate: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S: State> Guard<S> {
    /// Create a guard from a predicate over the current state.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard against `state`.
    pub fn check(&self, state: &S) -> bool {
        (self.predicate)(state)
    }
}

impl<S: State> Clone for Guard<S> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S: State> fmt::Debug for Guard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
