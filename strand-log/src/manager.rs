//! The log manager.
//!
//! `LogManager` is the entry point for producers and consumers:
//! - Log creation, deletion and inspection
//! - One memoized appender per log, bound to a codec
//! - Tailers with single-owner (group, partition) assignment
//! - Subscriptions through the backend's group coordination
//! - Best-effort shutdown of everything it handed out

#![allow(clippy::significant_drop_tightening)]

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use strand_codec::{CodecRef, Message};
use strand_core::{Limits, LogPartition, LogPartitionGroup, TailerId};
use tracing::{debug, info, warn};

use crate::appender::LogAppender;
use crate::backend::LogBackend;
use crate::closeable::Closeable;
use crate::error::{LogError, LogResult};
use crate::lag::LogLag;
use crate::registry::TailerRegistry;
use crate::tailer::{LogTailer, RebalanceListener};

/// A memoized appender.
struct AppenderEntry {
    /// Codec identity, `None` for the backend default.
    codec: Option<&'static str>,
    message_type: &'static str,
    handle: Arc<dyn Closeable>,
    /// The `Arc<dyn LogAppender<M>>`, type-erased.
    typed: Arc<dyn Any + Send + Sync>,
}

// -----------------------------------------------------------------------------
// Log Manager
// -----------------------------------------------------------------------------

/// Manages the logs of one backing store.
///
/// # Design
///
/// The manager owns no records. It validates requests, memoizes appenders,
/// enforces that a (group, partition) pair is read by at most one live
/// tailer, and closes everything it created on shutdown. Storage, offsets
/// and group coordination belong to the backend.
///
/// # Thread Safety
///
/// The manager is `Send + Sync` and can be shared across tasks. Log
/// creation is serialized; appender lookup and tailer registration each
/// take their own lock.
pub struct LogManager<B: LogBackend> {
    backend: Arc<B>,
    limits: Limits,
    /// Serializes creation and deletion.
    create_lock: tokio::sync::Mutex<()>,
    appenders: tokio::sync::Mutex<HashMap<String, AppenderEntry>>,
    tailers: Mutex<TailerRegistry>,
    next_tailer_id: AtomicU64,
    closed: AtomicBool,
}

impl<B: LogBackend> LogManager<B> {
    /// Creates a manager with default limits.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_limits(backend, Limits::new())
    }

    /// Creates a manager with explicit limits.
    #[must_use]
    pub fn with_limits(backend: B, limits: Limits) -> Self {
        Self {
            backend: Arc::new(backend),
            limits,
            create_lock: tokio::sync::Mutex::new(()),
            appenders: tokio::sync::Mutex::new(HashMap::new()),
            tailers: Mutex::new(TailerRegistry::default()),
            next_tailer_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a reference to the backing store.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the limits.
    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Returns true once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> LogResult<()> {
        if self.is_closed() {
            return Err(LogError::Closed {
                resource: "log manager",
            });
        }
        Ok(())
    }

    fn lock_tailers(&self) -> std::sync::MutexGuard<'_, TailerRegistry> {
        self.tailers.lock().expect("tailer registry lock poisoned")
    }

    // -------------------------------------------------------------------------
    // Log Lifecycle
    // -------------------------------------------------------------------------

    /// Creates a log unless it already exists.
    ///
    /// Returns true if this call created it. Concurrent calls for the same
    /// name create it exactly once.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a bad name or partition count.
    pub async fn create_if_not_exists(&self, name: &str, size: u32) -> LogResult<bool> {
        self.ensure_open()?;
        self.limits.check_log_name(name)?;
        self.limits.check_partition_count(size)?;

        let _guard = self.create_lock.lock().await;
        if self.backend.exists(name).await? {
            return Ok(false);
        }
        self.backend.create(name, size).await?;
        info!(log = %name, partitions = size, "Created log");
        Ok(true)
    }

    /// Returns true if the log exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn exists(&self, name: &str) -> LogResult<bool> {
        self.ensure_open()?;
        self.backend.exists(name).await
    }

    /// Deletes a log. Its memoized appender, if any, is closed.
    ///
    /// Returns false when the log did not exist or the backend cannot delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn delete(&self, name: &str) -> LogResult<bool> {
        self.ensure_open()?;
        let _guard = self.create_lock.lock().await;
        if !self.backend.delete(name).await? {
            return Ok(false);
        }
        let removed = self.appenders.lock().await.remove(name);
        if let Some(entry) = removed {
            if let Err(e) = entry.handle.close() {
                warn!(log = %name, error = %e, "Failed to close appender of deleted log");
            }
        }
        info!(log = %name, "Deleted log");
        Ok(true)
    }

    /// Returns the number of partitions of a log.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLog` if the log does not exist.
    pub async fn size(&self, name: &str) -> LogResult<u32> {
        self.ensure_open()?;
        self.backend.partition_count(name).await
    }

    /// Returns the names of all logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn list_all(&self) -> LogResult<Vec<String>> {
        self.ensure_open()?;
        self.backend.list_all().await
    }

    /// Returns the lag of a consumer group on every partition of a log.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLog` if the log does not exist.
    pub async fn get_lag(&self, name: &str, group: &str) -> LogResult<Vec<LogLag>> {
        self.ensure_open()?;
        let size = self.backend.partition_count(name).await?;
        let mut lags = Vec::with_capacity(size as usize);
        for partition in LogPartition::all_of(name, size) {
            let end = self.backend.end_offset(&partition).await?;
            let committed = self
                .backend
                .committed_offset(group, &partition)
                .await?
                .unwrap_or(0);
            lags.push(LogLag::new(partition, committed, end));
        }
        Ok(lags)
    }

    // -------------------------------------------------------------------------
    // Appenders
    // -------------------------------------------------------------------------

    /// Returns the appender of a log, creating it on first use.
    ///
    /// The first call binds the log's appender to `codec`. Later calls
    /// without a codec get that appender back; later calls with a codec
    /// must name the same codec.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLog` if the log does not exist, `CodecMismatch` if
    /// the codec disagrees with the existing appender, or
    /// `MessageTypeMismatch` if the appender carries another message type.
    pub async fn get_appender<M: Message>(
        &self,
        name: &str,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogAppender<M>>> {
        self.ensure_open()?;
        let mut appenders = self.appenders.lock().await;

        if let Some(entry) = appenders.get(name) {
            let typed = entry
                .typed
                .downcast_ref::<Arc<dyn LogAppender<M>>>()
                .cloned()
                .ok_or_else(|| LogError::MessageTypeMismatch {
                    name: name.to_string(),
                    existing: entry.message_type,
                    requested: type_name::<M>(),
                })?;
            let Some(requested) = codec else {
                return Ok(typed);
            };
            if entry.codec != Some(requested.identity()) {
                return Err(LogError::codec_mismatch(
                    name,
                    entry.codec,
                    Some(requested.identity()),
                ));
            }
            return Ok(typed);
        }

        if !self.backend.exists(name).await? {
            return Err(LogError::unknown_log(name));
        }
        let appender = self.backend.create_appender(name, codec).await?;
        let identity = appender.codec().map(|codec| codec.identity());
        appenders.insert(
            name.to_string(),
            AppenderEntry {
                codec: identity,
                message_type: type_name::<M>(),
                handle: Arc::clone(&appender).as_closeable(),
                typed: Arc::new(Arc::clone(&appender)),
            },
        );
        debug!(log = %name, codec = identity.unwrap_or("default"), "Created appender");
        Ok(appender)
    }

    // -------------------------------------------------------------------------
    // Tailers
    // -------------------------------------------------------------------------

    /// Creates a tailer reading `partitions` for `group`.
    ///
    /// Ownership is checked and reserved in one step before anything else,
    /// so two concurrent requests for the same (group, partition) cannot
    /// both succeed. The reservation is released if validation or the
    /// backend fails.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyAssigned` if a live tailer of the group owns one of
    /// the partitions, `UnknownLog` if a log does not exist, or
    /// `CodecMismatch` if a log's appender uses another codec.
    pub async fn create_tailer<M: Message>(
        &self,
        group: &str,
        partitions: &[LogPartition],
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        self.ensure_open()?;
        self.limits.check_group_name(group)?;
        self.limits.check_tailer_assignment(partitions.len())?;

        let mut unique: Vec<LogPartition> = Vec::with_capacity(partitions.len());
        for partition in partitions {
            if !unique.contains(partition) {
                unique.push(partition.clone());
            }
        }
        let keys: Vec<LogPartitionGroup> = unique
            .iter()
            .map(|partition| LogPartitionGroup::new(group, partition.clone()))
            .collect();

        let id = TailerId::new(self.next_tailer_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut tailers = self.lock_tailers();
            tailers.prune();
            tailers.reserve(id, &keys)?;
        }

        match self.open_tailer(group, &unique, codec).await {
            Ok(tailer) => {
                self.lock_tailers()
                    .activate(id, Arc::clone(&tailer).as_closeable());
                if self.is_closed() {
                    return Err(Self::discard_tailer(id, tailer.as_ref()));
                }
                debug!(
                    tailer = %id,
                    group = %group,
                    partitions = unique.len(),
                    "Created tailer"
                );
                Ok(tailer)
            }
            Err(e) => {
                self.lock_tailers().release(id, &keys);
                Err(e)
            }
        }
    }

    /// Creates a tailer on a single partition.
    ///
    /// # Errors
    ///
    /// Same as [`create_tailer`](Self::create_tailer).
    pub async fn create_partition_tailer<M: Message>(
        &self,
        group: &str,
        partition: LogPartition,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        self.create_tailer(group, std::slice::from_ref(&partition), codec)
            .await
    }

    /// Validates the logs behind a reserved tailer and asks the backend for it.
    async fn open_tailer<M: Message>(
        &self,
        group: &str,
        partitions: &[LogPartition],
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        let mut checked: Vec<&str> = Vec::new();
        for partition in partitions {
            let name = partition.name();
            if checked.contains(&name) {
                continue;
            }
            if !self.backend.exists(name).await? {
                return Err(LogError::unknown_log(name));
            }
            self.check_tailer_codec(name, codec.as_ref()).await?;
            checked.push(name);
        }
        self.backend.create_tailer(group, partitions, codec).await
    }

    /// An appender bound to a codec only accepts tailers with the same codec.
    /// An appender on the default codec accepts any tailer.
    async fn check_tailer_codec<M: Message>(
        &self,
        name: &str,
        codec: Option<&CodecRef<M>>,
    ) -> LogResult<()> {
        let appenders = self.appenders.lock().await;
        let Some(existing) = appenders.get(name).and_then(|entry| entry.codec) else {
            return Ok(());
        };
        let requested = codec.map(|codec| codec.identity());
        if requested == Some(existing) {
            return Ok(());
        }
        Err(LogError::codec_mismatch(name, Some(existing), requested))
    }

    /// Subscribes `group` to logs, letting the backend assign partitions.
    ///
    /// Logs are not validated: the backend assigns partitions of the logs
    /// that exist and rebalances as logs and members come and go.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the backend has no group coordination.
    pub async fn subscribe<M: Message>(
        &self,
        group: &str,
        names: &[String],
        listener: Arc<dyn RebalanceListener>,
        codec: Option<CodecRef<M>>,
    ) -> LogResult<Arc<dyn LogTailer<M>>> {
        self.ensure_open()?;
        if !self.backend.supports_subscribe() {
            return Err(LogError::Unsupported {
                operation: "subscribe",
            });
        }
        self.limits.check_group_name(group)?;

        let tailer = self.backend.subscribe(group, names, listener, codec).await?;
        let id = TailerId::new(self.next_tailer_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut tailers = self.lock_tailers();
            tailers.prune();
            tailers.track(id, Arc::clone(&tailer).as_closeable());
        }
        if self.is_closed() {
            return Err(Self::discard_tailer(id, tailer.as_ref()));
        }
        debug!(tailer = %id, group = %group, logs = ?names, "Subscribed tailer");
        Ok(tailer)
    }

    /// Closes a tailer opened while the manager was closing.
    ///
    /// `close` may already have drained the registry, so nothing else would
    /// close it.
    fn discard_tailer<T: Closeable + ?Sized>(id: TailerId, tailer: &T) -> LogError {
        if let Err(e) = tailer.close() {
            warn!(tailer = %id, error = %e, "Failed to close tailer opened during shutdown");
        }
        debug!(tailer = %id, "Discarded tailer opened during shutdown");
        LogError::Closed {
            resource: "log manager",
        }
    }

    /// Returns the number of open tailers created by this manager.
    #[must_use]
    pub fn live_tailers(&self) -> usize {
        self.lock_tailers().live_count()
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    /// Closes every appender, then every tailer.
    ///
    /// Every resource is attempted even when some fail. Later operations on
    /// the manager fail with `Closed`; closing again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CloseFailed` listing each resource that failed to close.
    pub async fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut appenders: Vec<(String, AppenderEntry)> =
            self.appenders.lock().await.drain().collect();
        appenders.sort_by(|a, b| a.0.cmp(&b.0));
        let tailers = self.lock_tailers().drain();

        let mut failures = Vec::new();
        for (name, entry) in &appenders {
            if let Err(e) = entry.handle.close() {
                warn!(log = %name, error = %e, "Failed to close appender");
                failures.push(format!("appender {name}: {e}"));
            }
        }
        for (id, tailer) in &tailers {
            if tailer.closed() {
                continue;
            }
            if let Err(e) = tailer.close() {
                warn!(tailer = %id, error = %e, "Failed to close tailer");
                failures.push(format!("{id}: {e}"));
            }
        }

        info!(
            appenders = appenders.len(),
            tailers = tailers.len(),
            failures = failures.len(),
            "Closed log manager"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LogError::CloseFailed { failures })
        }
    }
}
