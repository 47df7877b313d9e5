//! Interned signal identifiers.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned name of a signal.
///
/// Ids are only meaningful for the [`SignalTable`] (and thus the bus) that
/// produced them. [`SignalId::STATE_CHANGED`] is pre-interned in every table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(u32);

impl SignalId {
    /// Emitted by the registry after every committed state transition.
    pub const STATE_CHANGED: SignalId = SignalId(0);

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal:{}", self.0)
    }
}

pub(crate) const STATE_CHANGED_NAME: &str = "state_changed";

/// Two-way mapping between signal names and their ids.
#[derive(Clone, Debug)]
pub struct SignalTable {
    names: Vec<String>,
    ids: FxHashMap<String, SignalId>,
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalTable {
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            ids: FxHashMap::default(),
        };
        let state_changed = table.intern(STATE_CHANGED_NAME);
        debug_assert_eq!(state_changed, SignalId::STATE_CHANGED);
        table
    }

    /// Return the id for `name`, allocating one on first use.
    pub fn intern(&mut self, name: &str) -> SignalId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = SignalId(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Look up an already interned name without allocating.
    pub fn lookup(&self, name: &str) -> Option<SignalId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: SignalId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
