//! Finite state machines.
//!
//! A [`StateMachine`] owns a fixed set of declared states, an allow-list of
//! transitions (optionally guarded) and enter/exit hooks. Hooks run while
//! the transition is in flight; nested transitions from a hook are rejected
//! with [`MachineError::TransitionInProgress`] and should be
//! [deferred](HookContext::defer) instead.
//!
//! # Example
//!
//! ```rust
//! use lifeline::builder::StateMachineBuilder;
//! use lifeline::machine::MachineError;
//! use lifeline::state_enum;
//!
//! state_enum! {
//!     enum Life {
//!         Idle,
//!         Running,
//!         Dead,
//!     }
//!     final: [Dead]
//! }
//!
//! let mut machine = StateMachineBuilder::new()
//!     .states([Life::Idle, Life::Running, Life::Dead])
//!     .initial(Life::Idle)
//!     .transition(Life::Idle, Life::Running)
//!     .transition(Life::Running, Life::Dead)
//!     .build()
//!     .unwrap();
//!
//! assert!(matches!(
//!     machine.transition(Life::Dead),
//!     Err(MachineError::InvalidTransition { .. })
//! ));
//! machine.transition(Life::Running).unwrap();
//! machine.transition(Life::Dead).unwrap();
//! assert!(machine.is_final());
//! ```

mod capability;
mod definition;
mod error;
#[allow(clippy::module_inception)]
mod machine;
mod transition;

pub use capability::{Stateful, Updatable};
pub use definition::{Hook, HookContext, StateDefinition};
pub use error::MachineError;
pub use machine::StateMachine;
pub use transition::Transition;
