//! Partition storage for the in-memory store.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use strand_core::LogOffset;
use strand_core::LogPartition;

use crate::error::{LogError, LogResult};

/// A log held in memory: one vector of encoded records per partition.
#[derive(Debug)]
pub(crate) struct MemoryLog {
    name: Arc<str>,
    partitions: Vec<Mutex<Vec<Bytes>>>,
    deleted: AtomicBool,
}

impl MemoryLog {
    pub(crate) fn new(name: &str, size: u32) -> Self {
        Self {
            name: Arc::from(name),
            partitions: (0..size).map(|_| Mutex::new(Vec::new())).collect(),
            deleted: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    #[allow(clippy::cast_possible_truncation)] // Bounded by Limits::log_partitions_max.
    pub(crate) fn size(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Selects the partition for a key.
    pub(crate) fn partition_for_key(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)] // The modulus fits in u32.
        let partition = (hasher.finish() % u64::from(self.size())) as u32;
        partition
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    fn partition(&self, partition: u32) -> LogResult<&Mutex<Vec<Bytes>>> {
        if self.is_deleted() {
            return Err(LogError::unknown_log(self.name()));
        }
        self.partitions
            .get(partition as usize)
            .ok_or_else(|| LogError::PartitionOutOfRange {
                name: self.name().to_string(),
                partition,
                size: self.size(),
            })
    }

    /// Appends an encoded record and returns its offset.
    pub(crate) fn append(&self, partition: u32, data: Bytes) -> LogResult<LogOffset> {
        let mut records = self
            .partition(partition)?
            .lock()
            .expect("partition lock poisoned");
        let offset = records.len() as u64;
        records.push(data);
        Ok(LogOffset::new(
            LogPartition::new(Arc::clone(&self.name), partition),
            offset,
        ))
    }

    /// Returns the record at `offset`, if it was written.
    pub(crate) fn get(&self, partition: u32, offset: u64) -> LogResult<Option<Bytes>> {
        let records = self
            .partition(partition)?
            .lock()
            .expect("partition lock poisoned");
        Ok(usize::try_from(offset)
            .ok()
            .and_then(|index| records.get(index))
            .cloned())
    }

    /// Returns the offset one past the last record.
    pub(crate) fn end_offset(&self, partition: u32) -> LogResult<u64> {
        let records = self
            .partition(partition)?
            .lock()
            .expect("partition lock poisoned");
        Ok(records.len() as u64)
    }
}
