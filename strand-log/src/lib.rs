//! Strand Log - partitioned log management.
//!
//! A [`LogManager`] sits in front of a [`LogBackend`] and hands out
//! appenders and tailers for named, partitioned logs.
//!
//! # Overview
//!
//! - **Appenders** write typed messages through a codec. Each log has one
//!   memoized appender, so every producer of a log agrees on its codec.
//! - **Tailers** read a set of partitions on behalf of a consumer group.
//!   A (group, partition) pair is read by at most one live tailer.
//! - **Subscriptions** let the backend assign partitions within a group and
//!   report rebalances through a [`RebalanceListener`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use strand_codec::{BinaryCodec, CodecRef};
//! use strand_core::{LogPartition, Record};
//! use strand_log::{LogManager, MemoryLogStore};
//!
//! let manager = LogManager::new(MemoryLogStore::new());
//! manager.create_if_not_exists("events", 3).await?;
//!
//! let codec: CodecRef<Record> = Arc::new(BinaryCodec::<Record>::new());
//! let appender = manager.get_appender("events", Some(codec.clone())).await?;
//! appender.append("user-42", &Record::new("user-42", "clicked")).await?;
//!
//! let partitions = LogPartition::all_of("events", 3);
//! let tailer = manager.create_tailer("g1", &partitions, Some(codec)).await?;
//! let record = tailer.read(Duration::from_secs(1)).await?;
//! tailer.commit().await?;
//!
//! manager.close().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod appender;
mod backend;
mod closeable;
mod error;
mod lag;
mod manager;
pub mod memory;
mod registry;
mod tailer;

pub use appender::LogAppender;
pub use backend::LogBackend;
pub use closeable::Closeable;
pub use error::{LogError, LogResult};
pub use lag::LogLag;
pub use manager::LogManager;
pub use memory::{MemoryLogStore, MemoryStoreConfig};
pub use tailer::{LogRecord, LogTailer, NoopRebalanceListener, RebalanceListener};
