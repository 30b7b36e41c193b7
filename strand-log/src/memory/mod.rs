//! In-memory backing store.
//!
//! The reference [`LogBackend`](crate::LogBackend): logs, committed offsets
//! and consumer groups all live in process memory. Used by tests and by
//! embedders that do not need durability.

mod appender;
mod config;
mod group;
mod log;
mod store;
mod tailer;

pub use config::MemoryStoreConfig;
pub use store::{MemoryLogStore, MemoryStoreFaults, MemoryStoreStats};
