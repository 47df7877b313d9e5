//! Entity identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an entity.
///
/// Ids are handed out by [`Registry::register`](crate::Registry::register)
/// in increasing order and never reused, so a stale id can not alias a
/// newer entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
