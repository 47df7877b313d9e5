//! Lease handles.

use std::fmt;

/// Claim on a cached resource, returned by
/// [`ResourceCache::acquire`](super::ResourceCache::acquire).
///
/// A lease names an entry by key and generation. When the entry is
/// force-evicted the generation is retired, and every lease on it turns
/// stale even if the key is loaded again later.
///
/// Each acquisition gets its own serial. Clones share it, so releasing a
/// clone releases the original.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Lease {
    key: String,
    generation: u64,
    serial: u64,
}

impl Lease {
    pub(crate) fn new(key: &str, generation: u64, serial: u64) -> Self {
        Self {
            key: key.to_owned(),
            generation,
            serial,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.key, self.generation, self.serial)
    }
}
