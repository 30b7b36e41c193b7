//! Resources with an explicit close.

use crate::error::LogResult;

/// A resource that must be closed to release what it holds.
///
/// Closing is idempotent: the second call is a no-op returning `Ok`.
pub trait Closeable: Send + Sync {
    /// Closes the resource.
    ///
    /// # Errors
    /// Returns an error if releasing the underlying resources fails. The
    /// resource is still considered closed.
    fn close(&self) -> LogResult<()>;

    /// Returns true once `close` has been called.
    fn closed(&self) -> bool;
}
