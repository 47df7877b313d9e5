//! Building blocks shared by every other module:
//! - the `State` trait implemented by machine states
//! - guard predicates
//! - transition history
//! - entity identifiers

mod entity;
mod guard;
mod history;
mod state;

pub use entity::EntityId;
pub use guard::Guard;
pub use history::{StateHistory, StateTransition};
pub use state::State;
