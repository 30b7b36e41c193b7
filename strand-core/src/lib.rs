//! Strand Core - identifiers, records and limits shared by the Strand crates.
//!
//! This crate holds the value types every other Strand crate speaks in:
//! partition identifiers, the [`Record`] carried by logs with its closed
//! flag set, and the explicit [`Limits`] applied when logs are created.
//!
//! # Design Principles (TigerStyle)
//!
//! - **Strongly-typed IDs**: a tailer id is not a generation number
//! - **Explicit limits**: partition counts and names are bounded
//! - **Closed flag set**: record flags are an enumeration, not free bits
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod limits;
mod partition;
mod record;
mod types;

pub use error::{CoreError, CoreResult};
pub use limits::Limits;
pub use partition::{LogOffset, LogPartition, LogPartitionGroup};
pub use record::{Flag, Flags, Record};
pub use types::{Generation, MemberId, TailerId};
