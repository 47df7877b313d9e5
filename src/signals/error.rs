//! Signal bus errors.

use crate::core::EntityId;
use thiserror::Error;

use super::bus::SubscriptionId;

/// Failure reported by a subscriber callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CallbackError(String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// A subscriber that failed during one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub subscription: SubscriptionId,
    pub error: CallbackError,
}

/// Errors returned by the signal bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// One or more subscribers failed. Every other subscriber still ran.
    #[error("{} subscriber(s) of '{signal}' on {entity} failed", .failures.len())]
    CallbackFailed {
        entity: EntityId,
        signal: String,
        failures: Vec<CallbackFailure>,
    },

    #[error("Unknown subscription {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("Entity {0} has been retired")]
    EntityRetired(EntityId),
}
