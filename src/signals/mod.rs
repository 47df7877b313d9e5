//! Signal bus: typed publish/subscribe dispatch scoped to entities.
//!
//! Signal names are interned into [`SignalId`]s once, so dispatch never
//! hashes strings. Payloads are a single type `P` chosen by the host,
//! typically an enum covering every signal the game emits.
//!
//! Subscriber failures are accumulated rather than short-circuited: one
//! broken subscriber never hides the others, and the caller of
//! [`SignalBus::emit`] gets every failure once dispatch is done.

mod bus;
mod error;
mod id;

pub use bus::{Callback, Emission, SignalBus, SubscriptionId};
pub use error::{CallbackError, CallbackFailure, SignalError};
pub use id::{SignalId, SignalTable};
