//! Resource cache errors.

use thiserror::Error;

/// Failure reported by a [`Loader`](super::Loader).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Errors returned by the resource cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Entry '{key}' is still leased ({ref_count} outstanding)")]
    EntryInUse { key: String, ref_count: u32 },

    #[error("Lease on '{key}' is stale")]
    StaleHandle { key: String },

    #[error("Loading '{key}' failed: {source}")]
    LoaderFailed {
        key: String,
        #[source]
        source: LoadError,
    },

    #[error("Lease {lease} was already released")]
    AlreadyReleased { lease: String },
}
