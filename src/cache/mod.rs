//! Resource cache: keyed, reference-counted, load-once storage.
//!
//! Payloads come from a host-supplied [`Loader`]. Consumers hold
//! [`Lease`]s; forced eviction retires an entry's generation so that every
//! lease on it reports [`CacheError::StaleHandle`] from then on.

#[allow(clippy::module_inception)]
mod cache;
mod error;
mod lease;
mod loader;

pub use cache::{CacheStats, ResourceCache};
pub use error::{CacheError, LoadError};
pub use lease::Lease;
pub use loader::Loader;
