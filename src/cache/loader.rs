//! The host-supplied loading collaborator.

use super::error::LoadError;

/// Maps a cache key to a freshly loaded payload.
///
/// Any `FnMut(&str) -> Result<R, LoadError> + Send` closure is a loader.
pub trait Loader<R>: Send {
    fn load(&mut self, key: &str) -> Result<R, LoadError>;
}

impl<R, F> Loader<R> for F
where
    F: FnMut(&str) -> Result<R, LoadError> + Send,
{
    fn load(&mut self, key: &str) -> Result<R, LoadError> {
        self(key)
    }
}
