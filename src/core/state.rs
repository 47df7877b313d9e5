//! The `State` trait implemented by every state machine state.
//!
//! States are plain values (usually fieldless enums). The trait only asks
//! for what the machine, its history and its checkpoints need: equality,
//! cloning, a display name and serde support.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for state machine states.
///
/// # Required Traits
///
/// - `Clone`: states are copied into history records and change notifications
/// - `PartialEq`: the allow-list is matched by equality
/// - `Debug`: states show up in errors and log lines
/// - `Serialize` + `DeserializeOwned`: states are stored in checkpoints
///
/// # Example
///
/// ```rust
/// use lifeline::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Locomotion {
///     Idle,
///     Walking,
///     Dead,
/// }
///
/// impl State for Locomotion {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Walking => "Walking",
///             Self::Dead => "Dead",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Dead)
///     }
/// }
///
/// assert!(Locomotion::Dead.is_final());
/// assert_eq!(Locomotion::Walking.name(), "Walking");
/// ```
pub trait State: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync {
    /// Name used in log lines and error messages.
    fn name(&self) -> &str;

    /// Whether this is a terminal state.
    ///
    /// Terminal states are informational: the machine still honours any
    /// transition out of them that the allow-list contains.
    fn is_final(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

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

        fn is_final(&self) -> bool {
            matches!(self, Self::Dead)
        }
    }

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(TestState::Idle.name(), "Idle");
        assert_eq!(TestState::Running.name(), "Running");
        assert_eq!(TestState::Dead.name(), "Dead");
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        assert!(!TestState::Idle.is_final());
        assert!(!TestState::Running.is_final());
        assert!(TestState::Dead.is_final());
    }

    #[test]
    fn state_serializes_correctly() {
        let json = serde_json::to_string(&TestState::Running).unwrap();
        let deserialized: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, TestState::Running);
    }
}
