//! The in-memory backing store.

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use strand_codec::{CodecRef, Message};
use strand_core::{Generation, LogPartition, LogPartitionGroup, MemberId};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::appender::MemoryAppender;
use super::config::MemoryStoreConfig;
use super::group::GroupState;
use super::log::MemoryLog;
use super::tailer::{Membership, MemoryTailer};
use crate::appender::LogAppender;
use crate::backend::LogBackend;
use crate::error::{LogError, LogResult};
use crate::tailer::{LogTailer, RebalanceListener};

// -----------------------------------------------------------------------------
// Fault Configuration
// -----------------------------------------------------------------------------

/// One-shot faults for exercising error paths.
///
/// Each flag fails the next matching operation once and then resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreFaults {
    /// Fail the next `create_tailer`.
    pub force_create_tailer_fail: bool,
    /// Fail the next appender or tailer `close`. The resource still closes.
    pub force_close_fail: bool,
}

// -----------------------------------------------------------------------------
// Statistics
// -----------------------------------------------------------------------------

/// Counters of what the store handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    /// Logs currently stored.
    pub logs: usize,
    /// Appenders created since the store started.
    pub appenders_created: u64,
    /// Explicit tailers created since the store started.
    pub tailers_created: u64,
    /// Subscriptions created since the store started.
    pub subscriptions: u64,
}

// -----------------------------------------------------------------------------
// Shared State
// -----------------------------------------------------------------------------

/// State shared by the store, its appenders and its tailers.
#[derive(Debug)]
pub(crate) struct StoreInner {
    config: MemoryStoreConfig,
    logs: RwLock<HashMap<String, Arc<MemoryLog>>>,
    committed: Mutex<HashMap<LogPartitionGroup, u64>>,
    groups: Mutex<HashMap<String, GroupState>>,
    faults: Mutex<MemoryStoreFaults>,
    /// Woken on every append, rebalance and close.
    changed: Notify,
    next_member_id: AtomicU64,
    appenders_created: AtomicU64,
    tailers_created: AtomicU64,
    subscriptions: AtomicU64,
}

impl StoreInner {
    pub(crate) const fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    pub(crate) fn changed(&self) -> &Notify {
        &self.changed
    }

    pub(crate) fn wake(&self) {
        self.changed.notify_waiters();
    }

    pub(crate) fn log(&self, name: &str) -> Option<Arc<MemoryLog>> {
        self.logs
            .read()
            .expect("logs lock poisoned")
            .get(name)
            .cloned()
    }

    fn require_log(&self, name: &str) -> LogResult<Arc<MemoryLog>> {
        self.log(name).ok_or_else(|| LogError::unknown_log(name))
    }

    fn size_of(&self, name: &str) -> Option<u32> {
        self.log(name).map(|log| log.size())
    }

    pub(crate) fn committed(&self, group: &str, partition: &LogPartition) -> Option<u64> {
        let key = LogPartitionGroup::new(group, partition.clone());
        self.committed
            .lock()
            .expect("committed lock poisoned")
            .get(&key)
            .copied()
    }

    pub(crate) fn commit(&self, group: &str, partition: &LogPartition, offset: u64) {
        let key = LogPartitionGroup::new(group, partition.clone());
        self.committed
            .lock()
            .expect("committed lock poisoned")
            .insert(key, offset);
    }

    /// Consumes the one-shot close fault.
    pub(crate) fn take_close_fault(&self) -> bool {
        let mut faults = self.faults.lock().expect("faults lock poisoned");
        std::mem::take(&mut faults.force_close_fail)
    }

    fn take_create_tailer_fault(&self) -> bool {
        let mut faults = self.faults.lock().expect("faults lock poisoned");
        std::mem::take(&mut faults.force_create_tailer_fail)
    }

    pub(crate) fn group_assignment(
        &self,
        group: &str,
        member: MemberId,
    ) -> (Generation, Vec<LogPartition>) {
        let groups = self.groups.lock().expect("groups lock poisoned");
        groups
            .get(group)
            .map(|state| state.assignment(member))
            .unwrap_or_default()
    }

    fn join_group(&self, group: &str, names: &[String]) -> MemberId {
        let member = MemberId::new(self.next_member_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut groups = self.groups.lock().expect("groups lock poisoned");
        let state = groups.entry(group.to_string()).or_default();
        state.join(member, names.to_vec(), |name| self.size_of(name));
        info!(
            group = %group,
            member = %member,
            generation = %state.generation(),
            "Member joined consumer group"
        );
        drop(groups);
        self.wake();
        member
    }

    pub(crate) fn leave_group(&self, group: &str, member: MemberId) {
        let mut groups = self.groups.lock().expect("groups lock poisoned");
        let Some(state) = groups.get_mut(group) else {
            return;
        };
        if state.leave(member, |name| self.size_of(name)) {
            info!(
                group = %group,
                member = %member,
                generation = %state.generation(),
                "Member left consumer group"
            );
        }
        if state.is_empty() {
            groups.remove(group);
        }
        drop(groups);
        self.wake();
    }

    /// Rebalances every group subscribed to `name`.
    fn rebalance_watchers(&self, name: &str) {
        let mut groups = self.groups.lock().expect("groups lock poisoned");
        let mut rebalanced = false;
        for (group, state) in groups.iter_mut().filter(|(_, s)| s.watches(name)) {
            state.rebalance(|n| self.size_of(n));
            info!(group = %group, log = %name, generation = %state.generation(), "Rebalanced consumer group");
            rebalanced = true;
        }
        drop(groups);
        if rebalanced {
            self.wake();
        }
    }
}

// -----------------------------------------------------------------------------
// Memory Log Store
// -----------------------------------------------------------------------------

/// In-memory log store.
///
/// Clones share state via `Arc`. Records are kept encoded, so appenders and
/// tailers go through their codecs exactly as they would against a
/// persistent store. Subscriptions use range assignment within each
/// consumer group.
#[derive(Debug, Clone)]
pub struct MemoryLogStore {
    inner: Arc<StoreInner>,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates a store with an explicit configuration.
    #[must_use]
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                logs: RwLock::new(HashMap::new()),
                committed: Mutex::new(HashMap::new()),
                groups: Mutex::new(HashMap::new()),
                faults: Mutex::new(MemoryStoreFaults::default()),
                changed: Notify::new(),
                next_member_id: AtomicU64::new(0),
                appenders_created: AtomicU64::new(0),
                tailers_created: AtomicU64::new(0),
                subscriptions: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryStoreConfig {
        self.inner.config()
    }

    /// Returns fault config for modification.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn faults(&self) -> std::sync::MutexGuard<'_, MemoryStoreFaults> {
        self.inner.faults.lock().expect("faults lock poisoned")
    }

    /// Returns a snapshot of the store counters.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            logs: self.inner.logs.read().expect("logs lock poisoned").len(),
            appenders_created: self.inner.appenders_created.load(Ordering::Relaxed),
            tailers_created: self.inner.tailers_created.load(Ordering::Relaxed),
            subscriptions: self.inner.subscriptions.load(Ordering::Relaxed),
        }
    }

    fn check_partitions(&self, partitions: &[LogPartition]) -> LogResult<()> {
        for partition in partitions {
            let log = self.inner.require_log(partition.name())?;
            if partition.partition() >= log.size() {
                return Err(LogError::PartitionOutOfRange {
                    name: partition.name().to_string(),
                    partition: partition.partition(),
                    size: log.size(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LogBackend for MemoryLogStore {
    async fn exists(&self, name: &str) -> LogResult<bool> {
        Ok(self.inner.log(name).is_some())
    }

    async fn create(&self, name: &str, size: u32) -> LogResult<()> {
        let limits = &self.inner.config.limits;
        limits.check_log_name(name)?;
        limits.check_partition_count(size)?;

        {
            let mut logs = self.inner.logs.write().expect("logs lock poisoned");
            if logs.contains_key(name) {
                return Ok(());
            }
            logs.insert(name.to_string(), Arc::new(MemoryLog::new(name, size)));
        }
        debug!(log = %name, partitions = size, "Stored log");
        self.inner.rebalance_watchers(name);
        Ok(())
    }

    async fn delete(&self, name: &str) -> LogResult<bool> {
        let removed = self
            .inner
            .logs
            .write()
            .expect("logs lock poisoned")
            .remove(name);
        let Some(log) = removed else {
            return Ok(false);
        };
        log.mark_deleted();
        self.inner
            .committed
            .lock()
            .expect("committed lock poisoned")
            .retain(|key, _| key.partition().name() != name);
        debug!(log = %name, "Removed log");
        self.inner.rebalance_watchers(name);
        self.inner.wake();
        Ok(true)
    }

    async fn partition_count(&self, name: &str) -> LogResult<u32> {
        Ok(self.inner.require_log(name)?.size())
    }

    async fn list_all(&self) -> LogResult<Vec<String>> {
        let mut names: Vec<String> = self
            .inner
            .logs
            .read()
            .expect("logs lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn end_offset(&self, partition: &LogPartition) -> LogResult<u64> {
        self.inner
            .require_log(partition.name())?
            .end_offset(partition.partition())
    }

    async fn committed_offset(
        &self,
        group: &str,
        partition: &LogPartition,
    ) -> LogResult<Option<u64>> {
        Ok(self.inner.committed(group, partition))
    }

    fn supports_subscribe(&self) -> bool {
        self.inner.config.supports_subscribe
    }

    async fn create_appender<M: Message>(
        &self,
        name: &str,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogAppender<M>>> {
        let log = self.inner.require_log(name)?;
        self.inner.appenders_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryAppender::new(
            Arc::clone(&self.inner),
            log,
            codec,
        )))
    }

    async fn create_tailer<M: Message>(
        &self,
        group: &str,
        partitions: &[LogPartition],
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        self.check_partitions(partitions)?;
        if self.inner.take_create_tailer_fault() {
            return Err(LogError::Backend {
                operation: "create_tailer",
                message: "simulated failure".into(),
            });
        }
        self.inner.tailers_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryTailer::new(
            Arc::clone(&self.inner),
            group,
            partitions.to_vec(),
            None,
            codec,
        )))
    }

    async fn subscribe<M: Message>(
        &self,
        group: &str,
        names: &[String],
        listener: Arc<dyn RebalanceListener>,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        if !self.inner.config.supports_subscribe {
            return Err(LogError::Unsupported {
                operation: "subscribe",
            });
        }
        self.inner.config.limits.check_group_name(group)?;
        let member = self.inner.join_group(group, names);
        self.inner.subscriptions.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryTailer::new(
            Arc::clone(&self.inner),
            group,
            Vec::new(),
            Some(Membership::new(member, listener)),
            codec,
        )))
    }
}
