//! Partition identifiers.
//!
//! A [`LogPartition`] names one partition of a log, a [`LogPartitionGroup`]
//! pairs it with a consumer group to key tailer ownership, and a
//! [`LogOffset`] locates a record within a partition.

use std::fmt;
use std::sync::Arc;

/// A partition of a named log.
///
/// The name is reference counted so partitions are cheap to clone into
/// map keys and assignment lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPartition {
    name: Arc<str>,
    partition: u32,
}

impl LogPartition {
    /// Creates a partition identifier.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, partition: u32) -> Self {
        Self {
            name: name.into(),
            partition,
        }
    }

    /// Returns the log name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition index.
    #[must_use]
    pub const fn partition(&self) -> u32 {
        self.partition
    }

    /// Returns every partition of a log of the given size.
    #[must_use]
    pub fn all_of(name: &str, size: u32) -> Vec<Self> {
        let name: Arc<str> = Arc::from(name);
        (0..size)
            .map(|partition| Self {
                name: Arc::clone(&name),
                partition,
            })
            .collect()
    }
}

impl fmt::Display for LogPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.name, self.partition)
    }
}

/// A (consumer group, partition) pair.
///
/// At most one live tailer may own a given pair within a log manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogPartitionGroup {
    group: Arc<str>,
    partition: LogPartition,
}

impl LogPartitionGroup {
    /// Creates an assignment key.
    #[must_use]
    pub fn new(group: impl Into<Arc<str>>, partition: LogPartition) -> Self {
        Self {
            group: group.into(),
            partition,
        }
    }

    /// Returns the consumer group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the partition.
    #[must_use]
    pub const fn partition(&self) -> &LogPartition {
        &self.partition
    }
}

impl fmt::Display for LogPartitionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.partition)
    }
}

/// Position of a record: a partition and an offset within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogOffset {
    partition: LogPartition,
    offset: u64,
}

impl LogOffset {
    /// Creates a log offset.
    #[must_use]
    pub const fn new(partition: LogPartition, offset: u64) -> Self {
        Self { partition, offset }
    }

    /// Returns the partition.
    #[must_use]
    pub const fn partition(&self) -> &LogPartition {
        &self.partition
    }

    /// Returns the offset within the partition.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the offset of the record that follows this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            partition: self.partition.clone(),
            offset: self.offset.saturating_add(1),
        }
    }
}

impl fmt::Display for LogOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:+{}", self.partition, self.offset)
    }
}
