//! Errors from saving, loading and restoring machine checkpoints.

use thiserror::Error;

/// Where in a checkpoint an undeclared state was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointField {
    Current,
    Pending,
    History,
}

impl std::fmt::Display for CheckpointField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Current => "current",
            Self::Pending => "deferred",
            Self::History => "history",
        })
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// serde_json or bincode could not encode the checkpoint
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The bytes or text are not a checkpoint for this state type
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The machine is in the middle of a transition.
    #[error("Can not restore while a transition is in progress")]
    TransitionInProgress,

    /// The checkpoint came from a machine with a different set of states.
    /// Nothing was restored.
    #[error("{field} state '{state}' is not declared on this machine")]
    UndeclaredState {
        field: CheckpointField,
        state: String,
    },
}
