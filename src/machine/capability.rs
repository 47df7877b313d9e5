//! Capability traits composed onto entities instead of a class hierarchy.

use crate::core::State;
use std::time::Duration;

/// Something that is always in exactly one state.
pub trait Stateful {
    type State: State;

    fn current_state(&self) -> &Self::State;

    /// Time accumulated through updates since the last state change.
    fn time_in_state(&self) -> Duration;
}

/// Something advanced once per frame.
pub trait Updatable {
    type Output;

    fn update(&mut self, dt: Duration) -> Self::Output;
}
