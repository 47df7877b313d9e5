//! The host-owned container tying entities, machines, signals and cached
//! resources together.

use crate::cache::{CacheError, Lease, Loader, ResourceCache};
use crate::config::RegistryConfig;
use crate::core::{EntityId, State, StateTransition};
use crate::error::{Error, Result};
use crate::machine::{StateMachine, Updatable};
use crate::signals::{CallbackError, Emission, SignalBus, SignalError, SignalId, SubscriptionId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Payload of the `state_changed` signal.
///
/// The bus payload type must implement `From<StateChange<S>>` for the
/// registry to emit it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateChange<S: State> {
    pub entity: EntityId,
    pub machine: String,
    pub from: S,
    pub to: S,
    pub sequence: u64,
}

impl<S: State> StateChange<S> {
    fn new(entity: EntityId, machine: &str, transition: StateTransition<S>) -> Self {
        Self {
            entity,
            machine: machine.to_owned(),
            from: transition.from,
            to: transition.to,
            sequence: transition.sequence,
        }
    }
}

/// Outcome of one [`Registry::update`].
#[derive(Debug)]
pub struct UpdateReport<S: State> {
    /// Deferred transitions applied this frame, in entity order
    pub changes: Vec<StateChange<S>>,
    /// Rejected deferred transitions and failed `state_changed` subscribers
    pub errors: Vec<Error>,
}

impl<S: State> Default for UpdateReport<S> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<S: State> UpdateReport<S> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

struct EntityRecord<S: State> {
    machines: Vec<(String, StateMachine<S>)>,
    leases: Vec<Lease>,
}

impl<S: State> EntityRecord<S> {
    fn new() -> Self {
        Self {
            machines: Vec::new(),
            leases: Vec::new(),
        }
    }

    fn machine(&self, name: &str) -> Option<&StateMachine<S>> {
        self.machines
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, machine)| machine)
    }

    fn machine_mut(&mut self, name: &str) -> Option<&mut StateMachine<S>> {
        self.machines
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, machine)| machine)
    }
}

/// Entity table plus the signal bus and resource cache its entities share.
///
/// There is no global instance: the host creates a registry, passes it by
/// reference to whatever needs it, and drops it when the game shuts down.
/// All calls are expected on one thread; a multi-threaded host wraps the
/// registry in its own lock.
///
/// `S` is the machines' state type, `P` the signal payload type and `R` the
/// cached resource type.
///
/// # Example
///
/// ```rust
/// use lifeline::builder::StateMachineBuilder;
/// use lifeline::cache::LoadError;
/// use lifeline::signals::{Emission, SignalId};
/// use lifeline::{state_enum, Registry, StateChange};
/// use std::sync::{Arc, Mutex};
///
/// state_enum! {
///     enum Life {
///         Idle,
///         Running,
///         Dead,
///     }
///     final: [Dead]
/// }
///
/// let mut registry: Registry<Life, StateChange<Life>, Vec<u8>> =
///     Registry::new(|key: &str| -> Result<Vec<u8>, LoadError> { Ok(key.as_bytes().to_vec()) });
///
/// let player = registry.register();
/// let machine = StateMachineBuilder::new()
///     .states(Life::VARIANTS.iter().copied())
///     .initial(Life::Idle)
///     .transition(Life::Idle, Life::Running)
///     .build()
///     .unwrap();
/// registry.attach_machine(player, "life", machine).unwrap();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// registry
///     .subscribe(player, SignalId::STATE_CHANGED, move |e: &Emission<'_, StateChange<Life>>| {
///         sink.lock().unwrap().push(e.payload.to);
///         Ok(())
///     })
///     .unwrap();
///
/// registry.transition(player, "life", Life::Running).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![Life::Running]);
/// ```
pub struct Registry<S: State, P, R> {
    config: RegistryConfig,
    bus: SignalBus<P>,
    cache: ResourceCache<R>,
    entities: BTreeMap<EntityId, EntityRecord<S>>,
    next_entity: u64,
}

impl<S: State, P, R> Registry<S, P, R> {
    pub fn new<L>(loader: L) -> Self
    where
        L: Loader<R> + 'static,
    {
        Self::with_config(RegistryConfig::default(), loader)
    }

    pub fn with_config<L>(config: RegistryConfig, loader: L) -> Self
    where
        L: Loader<R> + 'static,
    {
        Self {
            cache: ResourceCache::with_config(config.cache.clone(), loader),
            bus: SignalBus::new(),
            entities: BTreeMap::new(),
            next_entity: 1,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // Entities

    pub fn register(&mut self) -> EntityId {
        let entity = EntityId::from_raw(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(entity, EntityRecord::new());
        debug!("registered {entity}");
        entity
    }

    /// Destroy `entity`: drop its machines, release its leases and retire
    /// it on the bus. Leases already invalidated by a forced eviction, or
    /// released directly on the cache, are skipped.
    pub fn unregister(&mut self, entity: EntityId) -> Result<()> {
        let record = self
            .entities
            .remove(&entity)
            .ok_or(Error::UnknownEntity(entity))?;

        for lease in &record.leases {
            match self.cache.release(lease) {
                Ok(_) => {}
                Err(CacheError::StaleHandle { .. } | CacheError::AlreadyReleased { .. }) => {
                    debug!("{entity}: lease {lease} was already given back")
                }
                Err(e) => warn!("{entity}: releasing {lease} failed: {e}"),
            }
        }
        self.bus.retire(entity);

        debug!(
            "unregistered {entity} ({} machine(s), {} lease(s))",
            record.machines.len(),
            record.leases.len()
        );
        Ok(())
    }

    pub fn is_registered(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Registered entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn record(&self, entity: EntityId) -> Result<&EntityRecord<S>> {
        self.entities
            .get(&entity)
            .ok_or(Error::UnknownEntity(entity))
    }

    fn record_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord<S>> {
        self.entities
            .get_mut(&entity)
            .ok_or(Error::UnknownEntity(entity))
    }

    // State machines

    /// Give `entity` a machine under `name`. Machines built without a
    /// history limit get the configured one.
    pub fn attach_machine(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        mut machine: StateMachine<S>,
    ) -> Result<()> {
        let name = name.into();
        let default_limit = self.config.history_limit;
        let record = self.record_mut(entity)?;

        if record.machine(&name).is_some() {
            return Err(Error::DuplicateMachine { entity, name });
        }
        if machine.history().limit().is_none() {
            machine.set_history_limit(default_limit);
        }
        record.machines.push((name, machine));
        Ok(())
    }

    /// Detach and return a machine. No signal is emitted.
    pub fn detach_machine(&mut self, entity: EntityId, name: &str) -> Result<StateMachine<S>> {
        let record = self.record_mut(entity)?;
        let index = record
            .machines
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| Error::UnknownMachine {
                entity,
                name: name.to_owned(),
            })?;
        Ok(record.machines.remove(index).1)
    }

    pub fn machine(&self, entity: EntityId, name: &str) -> Option<&StateMachine<S>> {
        self.entities.get(&entity)?.machine(name)
    }

    /// Names of `entity`'s machines, in attach order.
    pub fn machine_names(&self, entity: EntityId) -> Result<Vec<&str>> {
        Ok(self
            .record(entity)?
            .machines
            .iter()
            .map(|(name, _)| name.as_str())
            .collect())
    }

    fn machine_mut(&mut self, entity: EntityId, name: &str) -> Result<&mut StateMachine<S>> {
        self.record_mut(entity)?
            .machine_mut(name)
            .ok_or_else(|| Error::UnknownMachine {
                entity,
                name: name.to_owned(),
            })
    }

    /// Queue a transition for the next [`Registry::update`].
    pub fn defer(&mut self, entity: EntityId, machine: &str, to: S) -> Result<Option<S>> {
        Ok(self.machine_mut(entity, machine)?.defer(to))
    }

    /// Commit `machine`'s transition to `to`, then emit `state_changed` on
    /// `entity`.
    ///
    /// If a `state_changed` subscriber fails, the transition stays committed
    /// and the failure is returned as [`Error::Signal`].
    pub fn transition(&mut self, entity: EntityId, machine: &str, to: S) -> Result<StateChange<S>>
    where
        P: From<StateChange<S>>,
    {
        let committed = self.machine_mut(entity, machine)?.transition(to)?;
        let change = StateChange::new(entity, machine, committed);
        self.notify(&change)?;
        Ok(change)
    }

    /// Advance every machine by `dt`, applying deferred transitions and
    /// emitting `state_changed` for each one applied.
    pub fn update(&mut self, dt: Duration) -> UpdateReport<S>
    where
        P: From<StateChange<S>>,
    {
        let mut report = UpdateReport::default();
        let mut applied = Vec::new();

        for (entity, record) in self.entities.iter_mut() {
            for (name, machine) in record.machines.iter_mut() {
                match machine.update(dt) {
                    None => {}
                    Some(Ok(committed)) => applied.push(StateChange::new(*entity, name, committed)),
                    Some(Err(source)) => report.errors.push(Error::Deferred {
                        entity: *entity,
                        machine: name.clone(),
                        source,
                    }),
                }
            }
        }

        for change in applied {
            if let Err(e) = self.notify(&change) {
                report.errors.push(e.into());
            }
            report.changes.push(change);
        }
        report
    }

    fn notify(&mut self, change: &StateChange<S>) -> Result<usize, SignalError>
    where
        P: From<StateChange<S>>,
    {
        self.bus
            .emit(change.entity, SignalId::STATE_CHANGED, P::from(change.clone()))
    }

    // Signals

    /// Intern a signal name on the registry's bus.
    pub fn signal(&mut self, name: &str) -> SignalId {
        self.bus.intern(name)
    }

    pub fn subscribe<F>(
        &mut self,
        entity: EntityId,
        signal: SignalId,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        F: FnMut(&Emission<'_, P>) -> Result<(), CallbackError> + Send + 'static,
        P: 'static,
    {
        if !self.is_registered(entity) {
            return Err(Error::UnknownEntity(entity));
        }
        Ok(self.bus.subscribe(entity, signal, callback)?)
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> Result<()> {
        Ok(self.bus.unsubscribe(subscription)?)
    }

    /// Emit on the bus. Emitting on an unregistered entity is a no-op.
    pub fn emit(&mut self, entity: EntityId, signal: SignalId, payload: P) -> Result<usize> {
        Ok(self.bus.emit(entity, signal, payload)?)
    }

    pub fn bus(&self) -> &SignalBus<P> {
        &self.bus
    }

    /// Drop the subscriptions of every unregistered entity now instead of
    /// on the next emission addressed to it.
    pub fn prune_signals(&mut self) -> usize {
        self.bus.prune()
    }

    // Resources

    /// Lease `key` on behalf of `entity`. The lease is released when the
    /// entity is unregistered, unless released earlier.
    pub fn acquire(&mut self, entity: EntityId, key: &str) -> Result<Lease> {
        self.record(entity)?;
        let lease = self.cache.acquire(key)?;
        self.record_mut(entity)?.leases.push(lease.clone());
        Ok(lease)
    }

    /// Give back one of `entity`'s leases. Returns the remaining ref count.
    pub fn release(&mut self, entity: EntityId, lease: &Lease) -> Result<u32> {
        let record = self.record_mut(entity)?;
        let index = record
            .leases
            .iter()
            .position(|held| held == lease)
            .ok_or_else(|| Error::LeaseNotHeld {
                entity,
                lease: lease.to_string(),
            })?;
        record.leases.swap_remove(index);
        Ok(self.cache.release(lease)?)
    }

    pub fn resource(&self, lease: &Lease) -> Result<&R> {
        Ok(self.cache.get(lease)?)
    }

    pub fn cache(&self) -> &ResourceCache<R> {
        &self.cache
    }

    /// Direct cache access, e.g. for forced eviction or memory pressure.
    pub fn cache_mut(&mut self) -> &mut ResourceCache<R> {
        &mut self.cache
    }
}
