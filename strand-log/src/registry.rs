//! Tailer ownership tracking.
//!
//! Maps every (group, partition) key to the tailer that owns it. A key
//! counts as taken while its owner is reserved (being created) or live
//! (created and not closed). Closed owners are pruned lazily.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use strand_core::{LogPartitionGroup, TailerId};

use crate::closeable::Closeable;
use crate::error::{LogError, LogResult};

/// Tailer registry owned by a log manager.
#[derive(Default)]
pub(crate) struct TailerRegistry {
    owners: HashMap<LogPartitionGroup, TailerId>,
    reserved: HashSet<TailerId>,
    live: HashMap<TailerId, Arc<dyn Closeable>>,
}

impl TailerRegistry {
    fn is_active(&self, id: TailerId) -> bool {
        self.reserved.contains(&id) || self.live.get(&id).is_some_and(|tailer| !tailer.closed())
    }

    /// Reserves every key for `id`, or none of them.
    ///
    /// # Errors
    /// Returns `AlreadyAssigned` for the first key owned by an active tailer.
    pub(crate) fn reserve(&mut self, id: TailerId, keys: &[LogPartitionGroup]) -> LogResult<()> {
        if let Some(taken) = keys
            .iter()
            .find(|key| self.owners.get(*key).is_some_and(|owner| self.is_active(*owner)))
        {
            return Err(LogError::AlreadyAssigned {
                group: taken.group().to_string(),
                partition: taken.partition().clone(),
            });
        }
        for key in keys {
            self.owners.insert(key.clone(), id);
        }
        self.reserved.insert(id);
        Ok(())
    }

    /// Turns a reservation into a live tailer.
    pub(crate) fn activate(&mut self, id: TailerId, tailer: Arc<dyn Closeable>) {
        self.reserved.remove(&id);
        self.live.insert(id, tailer);
    }

    /// Drops a reservation and the keys it still owns.
    pub(crate) fn release(&mut self, id: TailerId, keys: &[LogPartitionGroup]) {
        self.reserved.remove(&id);
        for key in keys {
            if self.owners.get(key) == Some(&id) {
                self.owners.remove(key);
            }
        }
    }

    /// Tracks a tailer that owns no explicit keys.
    pub(crate) fn track(&mut self, id: TailerId, tailer: Arc<dyn Closeable>) {
        self.live.insert(id, tailer);
    }

    /// Forgets closed tailers and the keys they owned.
    pub(crate) fn prune(&mut self) {
        self.live.retain(|_, tailer| !tailer.closed());
        let Self {
            owners,
            reserved,
            live,
        } = self;
        owners.retain(|_, owner| reserved.contains(owner) || live.contains_key(owner));
    }

    /// Number of live tailers.
    pub(crate) fn live_count(&self) -> usize {
        self.live.values().filter(|tailer| !tailer.closed()).count()
    }

    /// Removes everything, returning the live tailers in id order.
    pub(crate) fn drain(&mut self) -> Vec<(TailerId, Arc<dyn Closeable>)> {
        self.owners.clear();
        self.reserved.clear();
        let mut tailers: Vec<_> = self.live.drain().collect();
        tailers.sort_by_key(|(id, _)| *id);
        tailers
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use strand_core::LogPartition;

    use super::*;

    #[derive(Default)]
    struct FakeTailer {
        closed: AtomicBool,
    }

    impl Closeable for FakeTailer {
        fn close(&self) -> LogResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn key(partition: u32) -> LogPartitionGroup {
        LogPartitionGroup::new("g1", LogPartition::new("events", partition))
    }

    #[test]
    fn test_reserved_keys_are_taken() {
        let mut registry = TailerRegistry::default();
        registry.reserve(TailerId::new(1), &[key(0), key(1)]).unwrap();

        let err = registry.reserve(TailerId::new(2), &[key(2), key(1)]).unwrap_err();
        assert!(matches!(err, LogError::AlreadyAssigned { .. }));
        // The failed reservation took nothing.
        registry.reserve(TailerId::new(3), &[key(2)]).unwrap();
    }

    #[test]
    fn test_release_frees_keys() {
        let mut registry = TailerRegistry::default();
        registry.reserve(TailerId::new(1), &[key(0)]).unwrap();
        registry.release(TailerId::new(1), &[key(0)]);
        registry.reserve(TailerId::new(2), &[key(0)]).unwrap();
    }

    #[test]
    fn test_closed_owner_frees_keys() {
        let mut registry = TailerRegistry::default();
        let tailer = Arc::new(FakeTailer::default());
        registry.reserve(TailerId::new(1), &[key(0)]).unwrap();
        registry.activate(TailerId::new(1), tailer.clone());
        assert_eq!(registry.live_count(), 1);

        assert!(registry.reserve(TailerId::new(2), &[key(0)]).is_err());
        tailer.close().unwrap();
        registry.reserve(TailerId::new(2), &[key(0)]).unwrap();
    }

    #[test]
    fn test_prune_and_drain() {
        let mut registry = TailerRegistry::default();
        let closed = Arc::new(FakeTailer::default());
        let open = Arc::new(FakeTailer::default());
        registry.reserve(TailerId::new(1), &[key(0)]).unwrap();
        registry.activate(TailerId::new(1), closed.clone());
        registry.track(TailerId::new(2), open);
        closed.close().unwrap();

        registry.prune();
        assert_eq!(registry.live_count(), 1);
        assert!(registry.owners.is_empty());

        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, TailerId::new(2));
        assert_eq!(registry.live_count(), 0);
    }
}
