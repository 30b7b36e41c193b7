//! The write side of a log.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use strand_codec::{CodecRef, Message};
use strand_core::LogOffset;

use crate::closeable::Closeable;
use crate::error::LogResult;

/// Appends messages to the partitions of one log.
///
/// Appenders are shared: a log manager memoizes one appender per log and
/// hands the same instance to every caller.
#[async_trait]
pub trait LogAppender<M: Message>: Closeable {
    /// Returns the log name.
    fn name(&self) -> &str;

    /// Returns the number of partitions.
    fn size(&self) -> u32;

    /// Returns the codec the appender was opened with, `None` for the
    /// backend default.
    fn codec(&self) -> Option<&CodecRef<M>>;

    /// Appends a message to the partition selected by hashing `key`.
    ///
    /// # Errors
    /// Returns `Closed` after close, or a codec error if encoding fails.
    async fn append(&self, key: &str, message: &M) -> LogResult<LogOffset>;

    /// Appends a message to an explicit partition.
    ///
    /// # Errors
    /// Returns `PartitionOutOfRange` if `partition >= size()`.
    async fn append_to(&self, partition: u32, message: &M) -> LogResult<LogOffset>;

    /// Upcasts to the close handle tracked by the log manager.
    fn as_closeable(self: Arc<Self>) -> Arc<dyn Closeable>;
}

impl<M: Message> fmt::Debug for dyn LogAppender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogAppender")
            .field("name", &self.name())
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
