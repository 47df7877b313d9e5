//! Crate-level error type.

use crate::builder::BuildError;
use crate::cache::CacheError;
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::core::EntityId;
use crate::machine::MachineError;
use crate::signals::SignalError;
use thiserror::Error;

/// Any error produced by the registry or one of its parts.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("Entity {entity} has no machine named '{name}'")]
    UnknownMachine { entity: EntityId, name: String },

    #[error("Entity {entity} already has a machine named '{name}'")]
    DuplicateMachine { entity: EntityId, name: String },

    #[error("Lease {lease} is not held by entity {entity}")]
    LeaseNotHeld { entity: EntityId, lease: String },

    #[error("Deferred transition of '{machine}' on {entity} failed: {source}")]
    Deferred {
        entity: EntityId,
        machine: String,
        #[source]
        source: MachineError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
