//! The storage abstraction a log manager drives.
//!
//! A backend owns the partitions, the committed offsets and, when it
//! supports subscriptions, the group membership. The manager layers
//! validation, memoization and ownership tracking on top.

use std::sync::Arc;

use async_trait::async_trait;
use strand_codec::{CodecRef, Message};
use strand_core::LogPartition;

use crate::appender::LogAppender;
use crate::error::{LogError, LogResult};
use crate::tailer::{LogTailer, RebalanceListener};

// -----------------------------------------------------------------------------
// Log Backend Trait
// -----------------------------------------------------------------------------

/// Storage primitives for partitioned logs.
#[async_trait]
pub trait LogBackend: Send + Sync + 'static {
    /// Returns true if the log exists.
    async fn exists(&self, name: &str) -> LogResult<bool>;

    /// Creates a log with `size` partitions.
    ///
    /// Called with the manager's creation lock held, after `exists`
    /// returned false.
    async fn create(&self, name: &str, size: u32) -> LogResult<()>;

    /// Deletes a log and its committed offsets.
    ///
    /// Returns false when the log did not exist or deletion is not
    /// supported.
    async fn delete(&self, _name: &str) -> LogResult<bool> {
        Ok(false)
    }

    /// Returns the partition count of a log.
    ///
    /// # Errors
    /// Returns `UnknownLog` if the log does not exist.
    async fn partition_count(&self, name: &str) -> LogResult<u32>;

    /// Returns the names of all logs.
    async fn list_all(&self) -> LogResult<Vec<String>>;

    /// Returns the offset one past the last record of a partition.
    async fn end_offset(&self, partition: &LogPartition) -> LogResult<u64>;

    /// Returns the committed offset of a group on a partition.
    async fn committed_offset(&self, group: &str, partition: &LogPartition)
        -> LogResult<Option<u64>>;

    /// Returns true if `subscribe` is implemented.
    fn supports_subscribe(&self) -> bool {
        false
    }

    /// Opens an appender on an existing log.
    async fn create_appender<M: Message>(
        &self,
        name: &str,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogAppender<M>>>;

    /// Opens a tailer on an explicit set of partitions.
    ///
    /// The manager has already checked existence and ownership.
    async fn create_tailer<M: Message>(
        &self,
        group: &str,
        partitions: &[LogPartition],
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>>;

    /// Joins `group` on the given logs and lets the backend assign
    /// partitions, notifying `listener` on every change.
    async fn subscribe<M: Message>(
        &self,
        _group: &str,
        _names: &[String],
        _listener: Arc<dyn RebalanceListener>,
        _codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        Err(LogError::Unsupported {
            operation: "subscribe",
        })
    }
}
