//! End-to-end scenarios driven through the registry.

use lifeline::builder::StateMachineBuilder;
use lifeline::cache::{CacheError, LoadError};
use lifeline::config::{CacheConfig, RegistryConfig};
use lifeline::machine::MachineError;
use lifeline::signals::{CallbackError, Emission, SignalError, SignalId};
use lifeline::{state_enum, EntityId, Error, Registry, StateChange, StateMachine};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

state_enum! {
    enum Life {
        Idle,
        Running,
        Dead,
    }
    final: [Dead]
}

/// Payload covering every signal the scenarios emit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum GameEvent {
    StateChanged(StateChange<Life>),
    Damaged { amount: u32 },
}

impl From<StateChange<Life>> for GameEvent {
    fn from(change: StateChange<Life>) -> Self {
        GameEvent::StateChanged(change)
    }
}

type Game = Registry<Life, GameEvent, Vec<u8>>;

fn game() -> Game {
    Registry::new(|key: &str| -> Result<Vec<u8>, LoadError> {
        if key.starts_with("missing/") {
            return Err(LoadError::NotFound(key.to_owned()));
        }
        Ok(key.as_bytes().to_vec())
    })
}

fn life() -> StateMachine<Life> {
    StateMachineBuilder::new()
        .states(Life::VARIANTS.iter().copied())
        .initial(Life::Idle)
        .transition(Life::Idle, Life::Running)
        .transition(Life::Running, Life::Dead)
        .build()
        .unwrap()
}

fn watch_state(game: &mut Game, entity: EntityId) -> Arc<Mutex<Vec<(Life, Life)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    game.subscribe(entity, SignalId::STATE_CHANGED, move |e: &Emission<'_, GameEvent>| {
        if let GameEvent::StateChanged(change) = e.payload {
            sink.lock().unwrap().push((change.from, change.to));
        }
        Ok(())
    })
    .unwrap();
    seen
}

#[test]
fn idle_running_dead_emits_two_state_changes() {
    let mut game = game();
    let hero = game.register();
    game.attach_machine(hero, "life", life()).unwrap();
    let seen = watch_state(&mut game, hero);

    assert!(matches!(
        game.transition(hero, "life", Life::Dead),
        Err(Error::Machine(MachineError::InvalidTransition { .. }))
    ));
    game.transition(hero, "life", Life::Running).unwrap();
    game.transition(hero, "life", Life::Dead).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Life::Idle, Life::Running), (Life::Running, Life::Dead)]
    );
    assert!(game.machine(hero, "life").unwrap().is_final());
}

#[test]
fn forced_eviction_makes_both_leases_stale() {
    let mut game = game();
    let hero = game.register();

    let first = game.acquire(hero, "a").unwrap();
    let second = game.acquire(hero, "a").unwrap();
    assert_eq!(game.cache().ref_count("a"), Some(2));

    assert!(matches!(
        game.cache_mut().evict("a"),
        Err(CacheError::EntryInUse { ref_count: 2, .. })
    ));
    assert!(game.cache_mut().force_evict("a"));

    for lease in [&first, &second] {
        assert!(matches!(
            game.resource(lease),
            Err(Error::Cache(CacheError::StaleHandle { .. }))
        ));
        assert!(matches!(
            game.release(hero, lease),
            Err(Error::Cache(CacheError::StaleHandle { .. }))
        ));
    }

    let reloaded = game.acquire(hero, "a").unwrap();
    assert_ne!(reloaded.generation(), first.generation());
    assert_eq!(game.resource(&reloaded).unwrap(), b"a");
}

#[test]
fn each_subscriber_runs_once_even_when_others_fail() {
    let mut game = game();
    let hero = game.register();
    let damaged = game.signal("damaged");
    let taken = Arc::new(Mutex::new(0u32));

    game.subscribe(hero, damaged, |_: &Emission<'_, GameEvent>| {
        Err(CallbackError::new("first listener broke"))
    })
    .unwrap();
    let sink = Arc::clone(&taken);
    game.subscribe(hero, damaged, move |e: &Emission<'_, GameEvent>| {
        if let GameEvent::Damaged { amount } = e.payload {
            *sink.lock().unwrap() += amount;
        }
        Ok(())
    })
    .unwrap();
    game.subscribe(hero, damaged, |_: &Emission<'_, GameEvent>| {
        Err("third listener broke".into())
    })
    .unwrap();

    let result = game.emit(hero, damaged, GameEvent::Damaged { amount: 5 });

    match result {
        Err(Error::Signal(SignalError::CallbackFailed { signal, failures, .. })) => {
            assert_eq!(signal, "damaged");
            assert_eq!(failures.len(), 2);
        }
        other => panic!("expected callback failures, got {other:?}"),
    }
    assert_eq!(*taken.lock().unwrap(), 5);
}

#[test]
fn signals_are_scoped_to_their_entity() {
    let mut game = game();
    let hero = game.register();
    let villain = game.register();
    let damaged = game.signal("damaged");
    let hits = Arc::new(Mutex::new(Vec::new()));

    for entity in [hero, villain] {
        let sink = Arc::clone(&hits);
        game.subscribe(entity, damaged, move |e: &Emission<'_, GameEvent>| {
            sink.lock().unwrap().push(e.entity);
            Ok(())
        })
        .unwrap();
    }

    assert_eq!(game.emit(villain, damaged, GameEvent::Damaged { amount: 1 }).unwrap(), 1);
    assert_eq!(*hits.lock().unwrap(), vec![villain]);
}

#[test]
fn destroyed_entity_drops_its_subscriptions() {
    let mut game = game();
    let hero = game.register();
    let damaged = game.signal("damaged");
    let calls = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&calls);
    game.subscribe(hero, damaged, move |_: &Emission<'_, GameEvent>| {
        *sink.lock().unwrap() += 1;
        Ok(())
    })
    .unwrap();

    game.unregister(hero).unwrap();

    assert_eq!(game.emit(hero, damaged, GameEvent::Damaged { amount: 1 }).unwrap(), 0);
    assert_eq!(*calls.lock().unwrap(), 0);
    assert_eq!(game.bus().retired_len(), 0);
    assert!(matches!(
        game.subscribe(hero, damaged, |_: &Emission<'_, GameEvent>| Ok(())),
        Err(Error::UnknownEntity(_))
    ));
}

#[test]
fn hook_chained_transitions_settle_over_frames() {
    let mut game = game();
    let hero = game.register();
    let machine = StateMachineBuilder::new()
        .states(Life::VARIANTS.iter().copied())
        .initial(Life::Idle)
        .transition(Life::Idle, Life::Running)
        .transition(Life::Running, Life::Dead)
        .on_enter(Life::Running, |ctx| {
            assert!(ctx.transition(Life::Dead).is_err());
            ctx.defer(Life::Dead);
        })
        .build()
        .unwrap();
    game.attach_machine(hero, "life", machine).unwrap();
    let seen = watch_state(&mut game, hero);

    game.transition(hero, "life", Life::Running).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);

    let report = game.update(Duration::from_millis(16));
    assert!(report.is_clean());
    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].to, Life::Dead);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Life::Idle, Life::Running), (Life::Running, Life::Dead)]
    );
}

#[test]
fn failed_load_leaves_nothing_behind() {
    let mut game = game();
    let hero = game.register();

    assert!(matches!(
        game.acquire(hero, "missing/boss.png"),
        Err(Error::Cache(CacheError::LoaderFailed { .. }))
    ));
    assert!(!game.cache().contains("missing/boss.png"));
    assert_eq!(game.cache().stats().load_failures, 1);

    game.unregister(hero).unwrap();
}

#[test]
fn memory_pressure_trims_idle_entries_to_capacity() {
    let config = RegistryConfig::default().cache(CacheConfig::default().idle_capacity(1));
    let mut game: Game = Registry::with_config(config, |key: &str| -> Result<Vec<u8>, LoadError> {
        Ok(key.as_bytes().to_vec())
    });
    let hero = game.register();

    let held = game.acquire(hero, "held").unwrap();
    for key in ["old", "new"] {
        let lease = game.acquire(hero, key).unwrap();
        game.release(hero, &lease).unwrap();
    }

    assert_eq!(game.cache_mut().on_memory_pressure(), 1);
    assert!(!game.cache().contains("old"));
    assert!(game.cache().contains("new"));
    assert!(game.resource(&held).is_ok());
}

#[test]
fn checkpoint_survives_a_round_trip_through_json() {
    let mut game = game();
    let hero = game.register();
    game.attach_machine(hero, "life", life()).unwrap();
    game.transition(hero, "life", Life::Running).unwrap();
    game.defer(hero, "life", Life::Dead).unwrap();

    let json = game.machine(hero, "life").unwrap().checkpoint().to_json().unwrap();

    let mut restored = life();
    restored
        .restore(&lifeline::checkpoint::MachineCheckpoint::from_json(&json).unwrap())
        .unwrap();
    assert_eq!(restored.current_state(), &Life::Running);
    assert_eq!(restored.pending(), Some(&Life::Dead));
    assert_eq!(restored.history().len(), 1);
}
