//! Builder API for ergonomic state machine construction.
//!
//! This module provides fluent builders and the [`state_enum!`](crate::state_enum)
//! macro for declaring machines with minimal boilerplate. All structural
//! checks (undeclared states, duplicates) happen once, in `build`.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
pub use transition::TransitionBuilder;
