//! Lifeline: entity lifecycle plumbing for frame-based game loops.
//!
//! A host game creates one [`Registry`] and drives it from its main loop.
//! The registry owns:
//!
//! - **Entities**: opaque [`EntityId`]s that are never reused
//! - **State machines**: per-entity [`StateMachine`]s with an explicit
//!   allow-list of transitions, guards and enter/exit hooks
//! - **Signals**: a [`SignalBus`](signals::SignalBus) scoped to entities,
//!   with the built-in `state_changed` signal emitted on every committed
//!   transition
//! - **Resources**: a reference-counted [`ResourceCache`](cache::ResourceCache)
//!   handing out [`Lease`](cache::Lease)s
//!
//! Everything runs on the host's thread. Nothing is global.
//!
//! # Example
//!
//! ```rust
//! use lifeline::builder::StateMachineBuilder;
//! use lifeline::cache::LoadError;
//! use lifeline::{state_enum, Registry, StateChange};
//! use std::time::Duration;
//!
//! state_enum! {
//!     enum Door {
//!         Closed,
//!         Opening,
//!         Open,
//!     }
//! }
//!
//! let mut registry: Registry<Door, StateChange<Door>, String> =
//!     Registry::new(|key: &str| -> Result<String, LoadError> { Ok(format!("<{key}>")) });
//!
//! let door = registry.register();
//! let machine = StateMachineBuilder::new()
//!     .states(Door::VARIANTS.iter().copied())
//!     .initial(Door::Closed)
//!     .transition(Door::Closed, Door::Opening)
//!     .on_enter(Door::Opening, |ctx| {
//!         ctx.defer(Door::Open);
//!     })
//!     .transition(Door::Opening, Door::Open)
//!     .build()
//!     .unwrap();
//! registry.attach_machine(door, "door", machine).unwrap();
//! let sprite = registry.acquire(door, "door.png").unwrap();
//!
//! registry.transition(door, "door", Door::Opening).unwrap();
//! let report = registry.update(Duration::from_millis(16));
//!
//! assert!(report.is_clean());
//! assert_eq!(registry.machine(door, "door").unwrap().current_state(), &Door::Open);
//! assert_eq!(registry.resource(&sprite).unwrap(), "<door.png>");
//!
//! registry.unregister(door).unwrap();
//! assert_eq!(registry.cache().ref_count("door.png"), Some(0));
//! ```

pub mod builder;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod machine;
pub mod signals;

mod error;
mod registry;

pub use crate::core::{EntityId, State};
pub use builder::{BuildError, StateMachineBuilder};
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use machine::{MachineError, StateMachine, Stateful, Updatable};
pub use registry::{Registry, StateChange, UpdateReport};
pub use signals::SignalId;
