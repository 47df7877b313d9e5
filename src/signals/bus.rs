//! Per-entity publish/subscribe dispatch.

use crate::core::EntityId;
use log::{trace, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

use super::error::{CallbackError, CallbackFailure, SignalError};
use super::id::{SignalId, SignalTable};

/// Handle returned by [`SignalBus::subscribe`]. Owned by the subscriber and
/// used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// What a subscriber is handed on dispatch.
#[derive(Debug)]
pub struct Emission<'a, P> {
    pub entity: EntityId,
    pub signal: SignalId,
    pub payload: &'a P,
}

/// Boxed subscriber callback.
pub type Callback<P> = Box<dyn FnMut(&Emission<'_, P>) -> Result<(), CallbackError> + Send>;

struct Subscriber<P> {
    id: SubscriptionId,
    callback: Callback<P>,
}

/// Typed signal bus.
///
/// Subscriptions are bucketed by `(entity, signal)`, so dispatch cost only
/// depends on the number of subscribers of that pair. Subscribers run
/// synchronously, in the order they subscribed.
///
/// The bus does not keep entities alive. When an entity is
/// [retired](SignalBus::retire) its subscriptions stay in place until the
/// next emission addressed to it, or until [`SignalBus::prune`]. Once they
/// are dropped the bus forgets the entity, so the retired set only holds
/// entities with subscriptions still waiting to be pruned.
///
/// # Example
///
/// ```rust
/// use lifeline::core::EntityId;
/// use lifeline::signals::{Emission, SignalBus};
///
/// let mut bus: SignalBus<i32> = SignalBus::new();
/// let player = EntityId::from_raw(1);
/// let damaged = bus.intern("damaged");
///
/// bus.subscribe(player, damaged, |e: &Emission<'_, i32>| {
///     if *e.payload > 100 {
///         return Err("overkill".into());
///     }
///     Ok(())
/// })
/// .unwrap();
///
/// assert_eq!(bus.emit(player, damaged, 10), Ok(1));
/// assert!(bus.emit(player, damaged, 500).is_err());
/// ```
pub struct SignalBus<P> {
    names: SignalTable,
    buckets: FxHashMap<(EntityId, SignalId), Vec<Subscriber<P>>>,
    index: FxHashMap<SubscriptionId, (EntityId, SignalId)>,
    /// Live subscriptions per entity
    per_entity: FxHashMap<EntityId, usize>,
    retired: FxHashSet<EntityId>,
    next_subscription: u64,
}

impl<P> Default for SignalBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for SignalBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("signals", &self.names.len())
            .field("subscriptions", &self.index.len())
            .field("retired", &self.retired.len())
            .finish()
    }
}

impl<P> SignalBus<P> {
    pub fn new() -> Self {
        Self {
            names: SignalTable::new(),
            buckets: FxHashMap::default(),
            index: FxHashMap::default(),
            per_entity: FxHashMap::default(),
            retired: FxHashSet::default(),
            next_subscription: 0,
        }
    }

    /// Intern a signal name. See [`SignalTable::intern`].
    pub fn intern(&mut self, name: &str) -> SignalId {
        self.names.intern(name)
    }

    pub fn signal_name(&self, signal: SignalId) -> Option<&str> {
        self.names.name(signal)
    }

    pub fn signals(&self) -> &SignalTable {
        &self.names
    }

    /// Register `callback` for `signal` emitted on `entity`.
    pub fn subscribe<F>(
        &mut self,
        entity: EntityId,
        signal: SignalId,
        callback: F,
    ) -> Result<SubscriptionId, SignalError>
    where
        F: FnMut(&Emission<'_, P>) -> Result<(), CallbackError> + Send + 'static,
        P: 'static,
    {
        if self.retired.contains(&entity) {
            return Err(SignalError::EntityRetired(entity));
        }

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        self.buckets
            .entry((entity, signal))
            .or_default()
            .push(Subscriber {
                id,
                callback: Box::new(callback),
            });
        self.index.insert(id, (entity, signal));
        *self.per_entity.entry(entity).or_default() += 1;
        trace!("{id} subscribed to {} on {entity}", self.display_name(signal));
        Ok(id)
    }

    /// Drop a subscription. Subscriptions already pruned with their entity
    /// count as unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SignalError> {
        let key = self
            .index
            .remove(&id)
            .ok_or(SignalError::UnknownSubscription(id))?;

        if let Some(subscribers) = self.buckets.get_mut(&key) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                self.buckets.remove(&key);
            }
        }
        self.forget_one(key.0);
        Ok(())
    }

    fn forget_one(&mut self, entity: EntityId) {
        if let Some(count) = self.per_entity.get_mut(&entity) {
            *count -= 1;
            if *count == 0 {
                self.per_entity.remove(&entity);
                self.retired.remove(&entity);
            }
        }
    }

    /// Dispatch `payload` to every subscriber of `(entity, signal)`.
    ///
    /// Returns how many callbacks ran. A failing callback does not stop the
    /// others; all failures are returned together once dispatch is done.
    /// Emitting with no subscribers is a no-op.
    pub fn emit(
        &mut self,
        entity: EntityId,
        signal: SignalId,
        payload: P,
    ) -> Result<usize, SignalError> {
        if self.retired.contains(&entity) {
            let dropped = self.prune_entity(entity);
            if dropped > 0 {
                trace!("pruned {dropped} subscription(s) of retired entity {entity}");
            }
            return Ok(0);
        }

        let Some(subscribers) = self.buckets.get_mut(&(entity, signal)) else {
            return Ok(0);
        };

        let emission = Emission {
            entity,
            signal,
            payload: &payload,
        };
        let outcomes: Vec<Validation<(), NonEmptyVec<CallbackFailure>>> = subscribers
            .iter_mut()
            .map(|subscriber| match (subscriber.callback)(&emission) {
                Ok(()) => Validation::success(()),
                Err(error) => Validation::fail(CallbackFailure {
                    subscription: subscriber.id,
                    error,
                }),
            })
            .collect();
        let invoked = outcomes.len();

        match Validation::all_vec(outcomes) {
            Validation::Success(_) => {
                trace!(
                    "{} dispatched to {invoked} subscriber(s) on {entity}",
                    self.display_name(signal)
                );
                Ok(invoked)
            }
            Validation::Failure(failures) => {
                let failures: Vec<CallbackFailure> = failures.iter().cloned().collect();
                let signal = self.display_name(signal);
                for failure in &failures {
                    warn!(
                        "subscriber {} of {signal} on {entity} failed: {}",
                        failure.subscription, failure.error
                    );
                }
                Err(SignalError::CallbackFailed {
                    entity,
                    signal,
                    failures,
                })
            }
        }
    }

    /// Mark `entity` as destroyed. Its subscriptions are dropped lazily and
    /// new subscriptions for it are refused until they are.
    ///
    /// An entity without subscriptions has nothing to prune and is not
    /// remembered. Refusing a destroyed id for good is up to the owner of
    /// the ids, as [`Registry`](crate::Registry) does.
    pub fn retire(&mut self, entity: EntityId) {
        if self.per_entity.contains_key(&entity) {
            self.retired.insert(entity);
        }
    }

    pub fn is_retired(&self, entity: EntityId) -> bool {
        self.retired.contains(&entity)
    }

    /// Eagerly drop the subscriptions of every retired entity, then forget
    /// those entities.
    pub fn prune(&mut self) -> usize {
        let retired = &self.retired;
        let index = &mut self.index;
        let mut dropped = 0;
        self.buckets.retain(|(entity, _), subscribers| {
            if !retired.contains(entity) {
                return true;
            }
            for subscriber in subscribers.iter() {
                index.remove(&subscriber.id);
            }
            dropped += subscribers.len();
            false
        });
        for entity in self.retired.drain() {
            self.per_entity.remove(&entity);
        }
        dropped
    }

    fn prune_entity(&mut self, target: EntityId) -> usize {
        let index = &mut self.index;
        let mut dropped = 0;
        self.buckets.retain(|(entity, _), subscribers| {
            if *entity != target {
                return true;
            }
            for subscriber in subscribers.iter() {
                index.remove(&subscriber.id);
            }
            dropped += subscribers.len();
            false
        });
        self.per_entity.remove(&target);
        self.retired.remove(&target);
        dropped
    }

    pub fn subscriber_count(&self, entity: EntityId, signal: SignalId) -> usize {
        self.buckets
            .get(&(entity, signal))
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Total number of live subscriptions, including not yet pruned ones.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Retired entities whose subscriptions have not been pruned yet.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    fn display_name(&self, signal: SignalId) -> String {
        self.names
            .name(signal)
            .map_or_else(|| signal.to_string(), str::to_owned)
    }
}
