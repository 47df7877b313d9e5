//! Keyed, reference-counted, load-once resource cache.

use crate::config::CacheConfig;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::CacheError;
use super::lease::Lease;
use super::loader::Loader;

/// Running counters kept by a [`ResourceCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Acquisitions served from an existing entry
    pub hits: u64,
    /// Acquisitions that went to the loader
    pub misses: u64,
    pub load_failures: u64,
    /// Entries removed by `evict`, `force_evict` or memory pressure
    pub evictions: u64,
}

struct CacheEntry<R> {
    payload: R,
    /// Serials of the leases not yet released
    outstanding: FxHashSet<u64>,
    generation: u64,
    last_access: DateTime<Utc>,
    access_tick: u64,
}

/// Load-once cache of resources keyed by path.
///
/// The first [`acquire`](ResourceCache::acquire) of a key runs the loader;
/// later ones share the entry and bump its ref count. An entry whose ref
/// count drops to zero stays cached (idle) until it is evicted explicitly or
/// trimmed by [`on_memory_pressure`](ResourceCache::on_memory_pressure).
///
/// Every lease carries its own serial, so the ref count is the number of
/// distinct leases not yet released. Releasing a lease a second time fails
/// instead of using up another holder's claim.
///
/// # Example
///
/// ```rust
/// use lifeline::cache::{CacheError, LoadError, ResourceCache};
///
/// let mut cache = ResourceCache::new(|key: &str| -> Result<String, LoadError> {
///     Ok(format!("texture bytes for {key}"))
/// });
///
/// let first = cache.acquire("hero.png").unwrap();
/// let second = cache.acquire("hero.png").unwrap();
/// assert_eq!(cache.ref_count("hero.png"), Some(2));
///
/// assert!(matches!(cache.evict("hero.png"), Err(CacheError::EntryInUse { .. })));
/// assert!(cache.force_evict("hero.png"));
/// assert!(matches!(cache.get(&first), Err(CacheError::StaleHandle { .. })));
/// assert!(matches!(cache.release(&second), Err(CacheError::StaleHandle { .. })));
/// ```
pub struct ResourceCache<R> {
    config: CacheConfig,
    loader: Box<dyn Loader<R>>,
    entries: FxHashMap<String, CacheEntry<R>>,
    next_generation: u64,
    next_serial: u64,
    clock: u64,
    stats: CacheStats,
}

impl<R> CacheEntry<R> {
    fn ref_count(&self) -> u32 {
        self.outstanding.len() as u32
    }
}

impl<R> fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<R> ResourceCache<R> {
    pub fn new<L>(loader: L) -> Self
    where
        L: Loader<R> + 'static,
    {
        Self::with_config(CacheConfig::default(), loader)
    }

    pub fn with_config<L>(config: CacheConfig, loader: L) -> Self
    where
        L: Loader<R> + 'static,
    {
        Self {
            config,
            loader: Box::new(loader),
            entries: FxHashMap::default(),
            next_generation: 0,
            next_serial: 0,
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Lease the entry for `key`, loading it on first use.
    ///
    /// A failed load leaves the cache unchanged.
    pub fn acquire(&mut self, key: &str) -> Result<Lease, CacheError> {
        self.clock += 1;
        let tick = self.clock;

        if let Some(entry) = self.entries.get_mut(key) {
            let serial = self.next_serial;
            self.next_serial += 1;
            entry.outstanding.insert(serial);
            entry.last_access = Utc::now();
            entry.access_tick = tick;
            self.stats.hits += 1;
            return Ok(Lease::new(key, entry.generation, serial));
        }

        self.stats.misses += 1;
        let payload = match self.loader.load(key) {
            Ok(payload) => payload,
            Err(source) => {
                self.stats.load_failures += 1;
                warn!("loading '{key}' failed: {source}");
                return Err(CacheError::LoaderFailed {
                    key: key.to_owned(),
                    source,
                });
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let serial = self.next_serial;
        self.next_serial += 1;
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                payload,
                outstanding: FxHashSet::from_iter([serial]),
                generation,
                last_access: Utc::now(),
                access_tick: tick,
            },
        );
        debug!("loaded '{key}' (generation {generation})");
        Ok(Lease::new(key, generation, serial))
    }

    /// Resolve a lease to its payload.
    pub fn get(&self, lease: &Lease) -> Result<&R, CacheError> {
        self.live_entry(lease).map(|entry| &entry.payload)
    }

    /// Give back one lease. Returns the remaining ref count. The entry is
    /// kept even when the count reaches zero.
    ///
    /// A lease (or any clone of it) is released at most once; repeating the
    /// call fails with [`CacheError::AlreadyReleased`] and leaves the count
    /// untouched.
    pub fn release(&mut self, lease: &Lease) -> Result<u32, CacheError> {
        let entry = self
            .entries
            .get_mut(lease.key())
            .filter(|entry| entry.generation == lease.generation())
            .ok_or_else(|| CacheError::StaleHandle {
                key: lease.key().to_owned(),
            })?;

        if !entry.outstanding.remove(&lease.serial()) {
            return Err(CacheError::AlreadyReleased {
                lease: lease.to_string(),
            });
        }
        Ok(entry.ref_count())
    }

    /// Remove an idle entry. Fails with [`CacheError::EntryInUse`] while any
    /// lease is outstanding. Returns whether an entry was removed.
    pub fn evict(&mut self, key: &str) -> Result<bool, CacheError> {
        match self.entries.get(key) {
            None => Ok(false),
            Some(entry) if entry.ref_count() > 0 => Err(CacheError::EntryInUse {
                key: key.to_owned(),
                ref_count: entry.ref_count(),
            }),
            Some(_) => {
                self.remove(key);
                Ok(true)
            }
        }
    }

    /// Remove an entry regardless of outstanding leases. Every lease on it
    /// becomes stale. Returns whether an entry was removed.
    pub fn force_evict(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        if entry.ref_count() > 0 {
            warn!(
                "force-evicting '{key}' with {} outstanding lease(s)",
                entry.ref_count()
            );
        }
        self.remove(key);
        true
    }

    /// Trim idle entries, least recently acquired first, down to the
    /// configured idle capacity. Returns how many entries were evicted.
    pub fn on_memory_pressure(&mut self) -> usize {
        let mut idle: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.ref_count() == 0)
            .map(|(key, entry)| (entry.access_tick, key.clone()))
            .collect();

        let excess = idle.len().saturating_sub(self.config.idle_capacity);
        if excess == 0 {
            return 0;
        }

        idle.sort_unstable();
        for (_, key) in idle.iter().take(excess) {
            self.remove(key);
        }
        debug!("memory pressure: evicted {excess} idle entries");
        excess
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.stats.evictions += 1;
            debug!("evicted '{key}' (generation {})", entry.generation);
        }
    }

    fn live_entry(&self, lease: &Lease) -> Result<&CacheEntry<R>, CacheError> {
        self.entries
            .get(lease.key())
            .filter(|entry| entry.generation == lease.generation())
            .ok_or_else(|| CacheError::StaleHandle {
                key: lease.key().to_owned(),
            })
    }

    /// Whether `lease` still refers to a cached entry.
    pub fn is_live(&self, lease: &Lease) -> bool {
        self.live_entry(lease).is_ok()
    }

    pub fn ref_count(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(CacheEntry::ref_count)
    }

    pub fn last_access(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|entry| entry.last_access)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries with no outstanding lease.
    pub fn idle_count(&self) -> usize {
        self.entries.values().filter(|e| e.ref_count() == 0).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
