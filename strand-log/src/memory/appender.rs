//! Appender over an in-memory log.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use strand_codec::{BinaryCodec, CodecRef, Message};
use strand_core::LogOffset;
use tracing::debug;

use super::log::MemoryLog;
use super::store::StoreInner;
use crate::appender::LogAppender;
use crate::closeable::Closeable;
use crate::error::{LogError, LogResult};

/// Appends encoded messages to a [`MemoryLog`].
///
/// Without an explicit codec, messages are written with the binary codec.
pub(crate) struct MemoryAppender<M: Message> {
    inner: Arc<StoreInner>,
    log: Arc<MemoryLog>,
    codec: Option<CodecRef<M>>,
    encoder: CodecRef<M>,
    closed: AtomicBool,
}

impl<M: Message> MemoryAppender<M> {
    pub(crate) fn new(
        inner: Arc<StoreInner>,
        log: Arc<MemoryLog>,
        codec: Option<CodecRef<M>>,
    ) -> Self {
        let encoder = codec
            .clone()
            .unwrap_or_else(|| Arc::new(BinaryCodec::<M>::new()) as CodecRef<M>);
        Self {
            inner,
            log,
            codec,
            encoder,
            closed: AtomicBool::new(false),
        }
    }
}

impl<M: Message> fmt::Debug for MemoryAppender<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAppender")
            .field("log", &self.log.name())
            .field("codec", &self.encoder.identity())
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}

impl<M: Message> Closeable for MemoryAppender<M> {
    fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(log = %self.log.name(), "Closed appender");
        if self.inner.take_close_fault() {
            return Err(LogError::Backend {
                operation: "close appender",
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
impl<M: Message> LogAppender<M> for MemoryAppender<M> {
    fn name(&self) -> &str {
        self.log.name()
    }

    fn size(&self) -> u32 {
        self.log.size()
    }

    fn codec(&self) -> Option<&CodecRef<M>> {
        self.codec.as_ref()
    }

    async fn append(&self, key: &str, message: &M) -> LogResult<LogOffset> {
        let partition = self.log.partition_for_key(key);
        self.append_to(partition, message).await
    }

    async fn append_to(&self, partition: u32, message: &M) -> LogResult<LogOffset> {
        if self.closed() {
            return Err(LogError::Closed {
                resource: "appender",
            });
        }
        let data = self.encoder.encode(message)?;
        let offset = self.log.append(partition, Bytes::from(data))?;
        self.inner.wake();
        Ok(offset)
    }

    fn as_closeable(self: Arc<Self>) -> Arc<dyn Closeable> {
        self
    }
}
