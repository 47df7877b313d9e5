//! State machine errors.

use thiserror::Error;

/// Errors returned when a transition can not be committed.
///
/// In every case the machine stays in the state it was in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("Transition from '{from}' to '{to}' is not allowed")]
    InvalidTransition { from: String, to: String },

    #[error("Guard rejected transition from '{from}' to '{to}'")]
    GuardRejected { from: String, to: String },

    #[error("Transition to '{requested}' requested while '{from}' -> '{to}' is in progress")]
    TransitionInProgress {
        from: String,
        to: String,
        requested: String,
    },
}
