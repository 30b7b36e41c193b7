//! Records carried by Strand logs.
//!
//! A record is a key, an opaque payload, a watermark and a set of control
//! flags. The flag set is closed: only the flags defined by [`Flag`] exist,
//! so every codec can round-trip it exhaustively.
//!
//! # Flags
//!
//! - `Default`: set on every freshly created record
//! - `Commit`: the record marks a logical checkpoint
//! - `PoisonPill`: the tailer stops consuming the partition after this record
//! - `Eof`: end of a bounded stream
//! - `Trace`: diagnostic marker
//! - `User1`, `User2`: reserved for applications

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single record control flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
    /// Set on newly created records.
    Default = 0b0000_0001,
    /// Logical checkpoint.
    Commit = 0b0000_0010,
    /// Stop consuming this partition.
    PoisonPill = 0b0000_0100,
    /// End of a bounded stream.
    Eof = 0b0000_1000,
    /// Diagnostic marker.
    Trace = 0b0001_0000,
    /// Application defined.
    User1 = 0b0010_0000,
    /// Application defined.
    User2 = 0b0100_0000,
}

impl Flag {
    /// Every known flag, in bit order.
    pub const ALL: [Self; 7] = [
        Self::Default,
        Self::Commit,
        Self::PoisonPill,
        Self::Eof,
        Self::Trace,
        Self::User1,
        Self::User2,
    ];

    /// Returns the bit of this flag.
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

/// A set of [`Flag`]s stored as a bit-set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Flags(u8);

impl Flags {
    const KNOWN_BITS: u8 = 0b0111_1111;

    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The set holding only [`Flag::Default`].
    #[must_use]
    pub const fn default_flags() -> Self {
        Self(Flag::Default.bit())
    }

    /// Builds a set from raw bits.
    ///
    /// # Errors
    /// Returns `UnknownFlags` if any bit does not map to a [`Flag`].
    pub fn from_bits(bits: u8) -> Result<Self, CoreError> {
        if bits & !Self::KNOWN_BITS != 0 {
            return Err(CoreError::UnknownFlags {
                bits: bits & !Self::KNOWN_BITS,
            });
        }
        Ok(Self(bits))
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if the flag is set.
    #[must_use]
    pub const fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Sets a flag.
    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.bit();
    }

    /// Clears a flag.
    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !flag.bit();
    }

    /// Returns true if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the flags that are set.
    pub fn iter(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |flag| self.contains(*flag))
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut flags = Self::empty();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl TryFrom<u8> for Flags {
    type Error = CoreError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<Flags> for u8 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A record appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Key, used to pick a partition.
    pub key: String,
    /// Opaque payload.
    pub data: Bytes,
    /// Watermark in milliseconds since Unix epoch, 0 when unset.
    pub watermark: u64,
    /// Control flags.
    pub flags: Flags,
}

impl Record {
    /// Creates a record with the `Default` flag and no watermark.
    #[must_use]
    pub fn new(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            watermark: 0,
            flags: Flags::default_flags(),
        }
    }

    /// Creates a record stamped with the current time as watermark.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Millis won't overflow u64 for centuries.
    pub fn now(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::new(key, data).with_watermark(millis)
    }

    /// Creates a poison pill record.
    #[must_use]
    pub fn poison_pill() -> Self {
        Self::new("", Bytes::new()).with_flags(Flags::from_iter([Flag::PoisonPill]))
    }

    /// Sets the watermark.
    #[must_use]
    pub const fn with_watermark(mut self, watermark: u64) -> Self {
        self.watermark = watermark;
        self
    }

    /// Replaces the flag set.
    #[must_use]
    pub const fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds one flag.
    #[must_use]
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.insert(flag);
        self
    }

    /// Returns true if the record carries the flag.
    #[must_use]
    pub const fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Returns true if this record tells tailers to stop the partition.
    #[must_use]
    pub const fn is_poison_pill(&self) -> bool {
        self.flags.contains(Flag::PoisonPill)
    }

    /// Returns the approximate size of the record in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        4 + self.key.len() + 4 + self.data.len() + 8 + 1
    }
}
