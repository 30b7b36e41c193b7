//! Tailer over in-memory logs.
//!
//! Explicit tailers read a fixed set of partitions. Subscribed tailers are
//! group members: on every read they compare their generation with the
//! group's and apply the new assignment before polling, reporting the
//! difference to the rebalance listener.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use strand_codec::{BinaryCodec, CodecRef, Message};
use strand_core::{Generation, LogOffset, LogPartition, MemberId};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::store::StoreInner;
use crate::closeable::Closeable;
use crate::error::{LogError, LogResult};
use crate::tailer::{LogRecord, LogTailer, RebalanceListener};

/// Group membership of a subscribed tailer.
pub(crate) struct Membership {
    member: MemberId,
    listener: Arc<dyn RebalanceListener>,
}

impl Membership {
    pub(crate) fn new(member: MemberId, listener: Arc<dyn RebalanceListener>) -> Self {
        Self { member, listener }
    }
}

/// Partitions gained and lost by a rebalance.
#[derive(Debug, Default)]
struct Rebalance {
    revoked: Vec<LogPartition>,
    assigned: Vec<LogPartition>,
}

#[derive(Debug, Clone, Copy)]
enum RebalanceEvent {
    Revoked,
    Assigned,
}

/// Read positions, guarded by one lock.
#[derive(Debug, Default)]
struct ReadState {
    generation: Generation,
    assignments: Vec<LogPartition>,
    positions: HashMap<LogPartition, u64>,
    /// Partitions that delivered a poison pill.
    stopped: HashSet<LogPartition>,
    /// Round-robin cursor into `assignments`.
    next: usize,
}

impl ReadState {
    fn position(&self, partition: &LogPartition) -> u64 {
        self.positions.get(partition).copied().unwrap_or(0)
    }

    fn require_assigned(&self, partition: &LogPartition) -> LogResult<()> {
        if self.assignments.contains(partition) {
            Ok(())
        } else {
            Err(LogError::NotAssigned {
                partition: partition.clone(),
            })
        }
    }
}

/// Reads and decodes records from in-memory logs.
pub(crate) struct MemoryTailer<M: Message> {
    inner: Arc<StoreInner>,
    group: String,
    codec: Option<CodecRef<M>>,
    decoder: CodecRef<M>,
    membership: Option<Membership>,
    state: Mutex<ReadState>,
    closed: AtomicBool,
}

impl<M: Message> MemoryTailer<M> {
    pub(crate) fn new(
        inner: Arc<StoreInner>,
        group: &str,
        partitions: Vec<LogPartition>,
        membership: Option<Membership>,
        codec: Option<CodecRef<M>>,
    ) -> Self {
        let decoder = codec
            .clone()
            .unwrap_or_else(|| Arc::new(BinaryCodec::<M>::new()) as CodecRef<M>);
        let positions = partitions
            .iter()
            .map(|p| (p.clone(), inner.committed(group, p).unwrap_or(0)))
            .collect();
        Self {
            inner,
            group: group.to_string(),
            codec,
            decoder,
            membership,
            state: Mutex::new(ReadState {
                assignments: partitions,
                positions,
                ..ReadState::default()
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> LogResult<()> {
        if self.closed() {
            return Err(LogError::Closed { resource: "tailer" });
        }
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReadState> {
        self.state.lock().expect("tailer state lock poisoned")
    }

    /// Applies the group's current assignment if its generation moved.
    async fn sync_assignment(&self) {
        let Some(membership) = &self.membership else {
            return;
        };
        let (generation, assigned) = self.inner.group_assignment(&self.group, membership.member);
        let Some(rebalance) = self.apply_assignment(generation, assigned) else {
            return;
        };
        info!(
            group = %self.group,
            member = %membership.member,
            generation = %generation,
            revoked = rebalance.revoked.len(),
            assigned = rebalance.assigned.len(),
            "Tailer rebalanced"
        );
        if !rebalance.revoked.is_empty() {
            self.notify_listener(membership, RebalanceEvent::Revoked, rebalance.revoked)
                .await;
        }
        if !rebalance.assigned.is_empty() {
            self.notify_listener(membership, RebalanceEvent::Assigned, rebalance.assigned)
                .await;
        }
    }

    fn apply_assignment(
        &self,
        generation: Generation,
        assigned: Vec<LogPartition>,
    ) -> Option<Rebalance> {
        let mut state = self.lock_state();
        if state.generation == generation {
            return None;
        }
        let mut rebalance = Rebalance::default();
        for partition in &state.assignments {
            if !assigned.contains(partition) {
                rebalance.revoked.push(partition.clone());
            }
        }
        for partition in &assigned {
            if !state.assignments.contains(partition) {
                rebalance.assigned.push(partition.clone());
            }
        }
        for partition in &rebalance.revoked {
            state.positions.remove(partition);
            state.stopped.remove(partition);
        }
        for partition in &rebalance.assigned {
            let position = self.inner.committed(&self.group, partition).unwrap_or(0);
            state.positions.insert(partition.clone(), position);
        }
        state.generation = generation;
        state.assignments = assigned;
        state.next = 0;
        Some(rebalance)
    }

    /// Runs a listener callback on the blocking pool, bounded by the
    /// configured timeout. An overrunning callback is left to finish alone.
    async fn notify_listener(
        &self,
        membership: &Membership,
        event: RebalanceEvent,
        partitions: Vec<LogPartition>,
    ) {
        let listener = Arc::clone(&membership.listener);
        let task = tokio::task::spawn_blocking(move || match event {
            RebalanceEvent::Revoked => listener.on_partitions_revoked(&partitions),
            RebalanceEvent::Assigned => listener.on_partitions_assigned(&partitions),
        });
        let timeout = self.inner.config().listener_timeout;
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(group = %self.group, ?event, error = %e, "Rebalance listener failed");
            }
            Err(_) => {
                warn!(group = %self.group, ?event, ?timeout, "Rebalance listener timed out");
            }
        }
    }

    /// Returns the next available record, visiting partitions round-robin.
    fn poll_once(&self) -> LogResult<Option<LogRecord<M>>> {
        let mut state = self.lock_state();
        let count = state.assignments.len();
        for step in 0..count {
            let index = (state.next + step) % count;
            let partition = state.assignments[index].clone();
            if state.stopped.contains(&partition) {
                continue;
            }
            let Some(log) = self.inner.log(partition.name()) else {
                continue;
            };
            let position = state.position(&partition);
            let Some(data) = log.get(partition.partition(), position)? else {
                continue;
            };

            // Advance before decoding so a corrupt record is skipped.
            state.next = (index + 1) % count;
            state.positions.insert(partition.clone(), position + 1);
            let message = self.decoder.decode(&data)?;
            if message.is_poison_pill() {
                debug!(group = %self.group, partition = %partition, "Partition stopped by poison pill");
                state.stopped.insert(partition.clone());
            }
            return Ok(Some(LogRecord {
                offset: LogOffset::new(partition, position),
                message,
            }));
        }
        Ok(None)
    }
}

impl<M: Message> fmt::Debug for MemoryTailer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTailer")
            .field("group", &self.group)
            .field("codec", &self.decoder.identity())
            .field("subscribed", &self.membership.is_some())
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}

impl<M: Message> Closeable for MemoryTailer<M> {
    fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(membership) = &self.membership {
            self.inner.leave_group(&self.group, membership.member);
        }
        self.inner.wake();
        debug!(group = %self.group, "Closed tailer");
        if self.inner.take_close_fault() {
            return Err(LogError::Backend {
                operation: "close tailer",
                message: "simulated failure".into(),
            });
        }
        Ok(())
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<M: Message> LogTailer<M> for MemoryTailer<M> {
    fn group(&self) -> &str {
        &self.group
    }

    fn assignments(&self) -> Vec<LogPartition> {
        self.lock_state().assignments.clone()
    }

    fn codec(&self) -> Option<&CodecRef<M>> {
        self.codec.as_ref()
    }

    async fn read(&self, timeout: Duration) -> LogResult<Option<LogRecord<M>>> {
        // `None` when the timeout is too large to represent: wait until woken.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            self.ensure_open()?;
            // Registered before polling so an append in between still wakes us.
            let changed = self.inner.changed().notified();
            tokio::pin!(changed);

            self.sync_assignment().await;
            if let Some(record) = self.poll_once()? {
                return Ok(Some(record));
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    tokio::select! {
                        () = tokio::time::sleep_until(deadline) => {}
                        () = &mut changed => {}
                    }
                }
                None => changed.as_mut().await,
            }
        }
    }

    async fn commit(&self) -> LogResult<()> {
        self.ensure_open()?;
        let state = self.lock_state();
        for partition in &state.assignments {
            self.inner
                .commit(&self.group, partition, state.position(partition));
        }
        Ok(())
    }

    async fn commit_partition(&self, partition: &LogPartition) -> LogResult<LogOffset> {
        self.ensure_open()?;
        let state = self.lock_state();
        state.require_assigned(partition)?;
        let position = state.position(partition);
        self.inner.commit(&self.group, partition, position);
        Ok(LogOffset::new(partition.clone(), position))
    }

    async fn to_start(&self) -> LogResult<()> {
        self.ensure_open()?;
        let mut state = self.lock_state();
        let assignments = state.assignments.clone();
        for partition in assignments {
            state.positions.insert(partition, 0);
        }
        state.stopped.clear();
        Ok(())
    }

    async fn to_end(&self) -> LogResult<()> {
        self.ensure_open()?;
        let mut state = self.lock_state();
        let assignments = state.assignments.clone();
        for partition in assignments {
            let end = match self.inner.log(partition.name()) {
                Some(log) => log.end_offset(partition.partition())?,
                None => 0,
            };
            state.positions.insert(partition, end);
        }
        state.stopped.clear();
        Ok(())
    }

    async fn to_last_committed(&self) -> LogResult<()> {
        self.ensure_open()?;
        let mut state = self.lock_state();
        let assignments = state.assignments.clone();
        for partition in assignments {
            let committed = self.inner.committed(&self.group, &partition).unwrap_or(0);
            state.positions.insert(partition, committed);
        }
        state.stopped.clear();
        Ok(())
    }

    async fn seek(&self, offset: &LogOffset) -> LogResult<()> {
        self.ensure_open()?;
        let mut state = self.lock_state();
        state.require_assigned(offset.partition())?;
        state
            .positions
            .insert(offset.partition().clone(), offset.offset());
        state.stopped.remove(offset.partition());
        Ok(())
    }

    fn as_closeable(self: Arc<Self>) -> Arc<dyn Closeable> {
        self
    }
}
