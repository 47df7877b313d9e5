//! Frame Loop
//!
//! This example drives a registry from a fixed-step game loop.
//!
//! Key concepts:
//! - Entities with a `life` machine (Idle -> Running -> Dead)
//! - Deferred transitions applied by the next frame's update
//! - Game signals carried in one payload enum next to `state_changed`
//! - Sprite leases released when an entity is destroyed
//!
//! Run with: RUST_LOG=debug cargo run --example frame_loop

use lifeline::builder::{BuildError, StateMachineBuilder};
use lifeline::cache::LoadError;
use lifeline::config::RegistryConfig;
use lifeline::signals::{Emission, SignalId};
use lifeline::{state_enum, EntityId, Registry, StateChange, StateMachine};
use log::info;
use std::time::Duration;

state_enum! {
    enum Life {
        Idle,
        Running,
        Dead,
    }
    final: [Dead]
}

#[derive(Clone, Debug)]
enum GameEvent {
    StateChanged(StateChange<Life>),
    Damaged { amount: u32 },
}

impl From<StateChange<Life>> for GameEvent {
    fn from(change: StateChange<Life>) -> Self {
        GameEvent::StateChanged(change)
    }
}

struct Sprite {
    path: String,
}

const FRAME: Duration = Duration::from_millis(16);

fn life_machine() -> Result<StateMachine<Life>, BuildError> {
    StateMachineBuilder::new()
        .states(Life::VARIANTS.iter().copied())
        .initial(Life::Idle)
        .transition(Life::Idle, Life::Running)
        .transition(Life::Running, Life::Dead)
        .on_enter(Life::Running, |ctx| {
            info!("  {:?} -> {:?}: start running", ctx.from(), ctx.to());
        })
        .on_enter(Life::Dead, |_| info!("  play death animation"))
        .build()
}

fn spawn(
    game: &mut Registry<Life, GameEvent, Sprite>,
    health: u32,
) -> Result<EntityId, lifeline::Error> {
    let entity = game.register();
    game.attach_machine(entity, "life", life_machine()?)?;
    game.acquire(entity, "sprites/goblin.png")?;

    let damaged = game.signal("damaged");
    let mut remaining = health;
    game.subscribe(entity, damaged, move |e: &Emission<'_, GameEvent>| {
        if let GameEvent::Damaged { amount } = e.payload {
            remaining = remaining.saturating_sub(*amount);
            info!("  {} has {remaining} hp left", e.entity);
        }
        Ok(())
    })?;
    game.subscribe(entity, SignalId::STATE_CHANGED, |e: &Emission<'_, GameEvent>| {
        if let GameEvent::StateChanged(change) = e.payload {
            info!(
                "  state_changed on {}: {:?} -> {:?} (#{})",
                change.entity, change.from, change.to, change.sequence
            );
        }
        Ok(())
    })?;
    Ok(entity)
}

fn main() -> Result<(), lifeline::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RegistryConfig::default().history_limit(8);
    let mut game: Registry<Life, GameEvent, Sprite> =
        Registry::with_config(config, |path: &str| -> Result<Sprite, LoadError> {
            Ok(Sprite {
                path: path.to_owned(),
            })
        });

    let goblins = [spawn(&mut game, 10)?, spawn(&mut game, 4)?];
    let damaged = game.signal("damaged");

    for frame in 0..6u32 {
        info!("frame {frame}");

        match frame {
            0 => {
                for goblin in goblins {
                    game.transition(goblin, "life", Life::Running)?;
                }
            }
            2 => {
                game.emit(goblins[1], damaged, GameEvent::Damaged { amount: 5 })?;
                game.defer(goblins[1], "life", Life::Dead)?;
            }
            4 => {
                let dead: Vec<EntityId> = game
                    .entities()
                    .filter(|entity| {
                        game.machine(*entity, "life")
                            .is_some_and(|machine| machine.is_final())
                    })
                    .collect();
                for entity in dead {
                    info!("  destroying {entity}");
                    game.unregister(entity)?;
                }
            }
            _ => {}
        }

        let report = game.update(FRAME);
        for error in &report.errors {
            info!("  update error: {error}");
        }
    }

    let sprite = game.acquire(goblins[0], "sprites/goblin.png")?;
    info!(
        "{} entities alive, '{}' leased {} time(s)",
        game.len(),
        game.resource(&sprite)?.path,
        game.cache().ref_count("sprites/goblin.png").unwrap_or(0)
    );
    Ok(())
}
