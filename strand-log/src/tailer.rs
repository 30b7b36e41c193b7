//! The read side of a log.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strand_codec::{CodecRef, Message};
use strand_core::{LogOffset, LogPartition};

use crate::closeable::Closeable;
use crate::error::LogResult;

/// A message read from a log, with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<M> {
    /// Where the message was read.
    pub offset: LogOffset,
    /// The decoded message.
    pub message: M,
}

/// Reads messages from a set of partitions on behalf of a consumer group.
///
/// Positions start at the group's committed offsets, or at the start of the
/// partition when nothing was committed.
#[async_trait]
pub trait LogTailer<M: Message>: Closeable {
    /// Returns the consumer group.
    fn group(&self) -> &str;

    /// Returns the partitions currently assigned.
    ///
    /// Fixed for explicit tailers; follows rebalances for subscriptions.
    fn assignments(&self) -> Vec<LogPartition>;

    /// Returns the codec the tailer was opened with, `None` for the
    /// backend default.
    fn codec(&self) -> Option<&CodecRef<M>>;

    /// Reads the next message, waiting at most `timeout`.
    ///
    /// Returns `None` when nothing arrived in time. A partition stops
    /// yielding after a poison pill until the tailer is repositioned.
    ///
    /// # Errors
    /// Returns `Closed` after close, or a codec error if a record does not
    /// decode. The undecodable record is skipped.
    async fn read(&self, timeout: Duration) -> LogResult<Option<LogRecord<M>>>;

    /// Commits the current position of every assigned partition.
    ///
    /// # Errors
    /// Returns `Closed` after close.
    async fn commit(&self) -> LogResult<()>;

    /// Commits the current position of one partition and returns it.
    ///
    /// # Errors
    /// Returns `NotAssigned` if the partition is not assigned.
    async fn commit_partition(&self, partition: &LogPartition) -> LogResult<LogOffset>;

    /// Moves every assigned partition to its first record.
    ///
    /// # Errors
    /// Returns `Closed` after close.
    async fn to_start(&self) -> LogResult<()>;

    /// Moves every assigned partition past its last record.
    ///
    /// # Errors
    /// Returns `Closed` after close.
    async fn to_end(&self) -> LogResult<()>;

    /// Moves every assigned partition to the group's committed offset.
    ///
    /// # Errors
    /// Returns `Closed` after close.
    async fn to_last_committed(&self) -> LogResult<()>;

    /// Moves one partition to an explicit offset.
    ///
    /// # Errors
    /// Returns `NotAssigned` if the partition is not assigned.
    async fn seek(&self, offset: &LogOffset) -> LogResult<()>;

    /// Upcasts to the close handle tracked by the log manager.
    fn as_closeable(self: Arc<Self>) -> Arc<dyn Closeable>;
}

impl<M: Message> fmt::Debug for dyn LogTailer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogTailer")
            .field("group", &self.group())
            .field("assignments", &self.assignments())
            .finish_non_exhaustive()
    }
}

/// Callback invoked when a subscription's assignment changes.
///
/// Callbacks run on a blocking thread and are bounded by the store's
/// listener timeout; an overrunning callback is logged and abandoned.
pub trait RebalanceListener: Send + Sync {
    /// Called before partitions are taken away.
    fn on_partitions_revoked(&self, partitions: &[LogPartition]);

    /// Called after new partitions were assigned.
    fn on_partitions_assigned(&self, partitions: &[LogPartition]);
}

/// A listener that ignores every rebalance.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRebalanceListener;

impl RebalanceListener for NoopRebalanceListener {
    fn on_partitions_revoked(&self, _partitions: &[LogPartition]) {}

    fn on_partitions_assigned(&self, _partitions: &[LogPartition]) {}
}
