//! Counters handed out by log managers and consumer groups.
//!
//! Each is a distinct `u64` newtype, so a tailer id cannot be passed where
//! a group generation is expected.

use std::fmt;

/// Declares a `u64` counter newtype that prints as `<prefix>-<n>`.
macro_rules! define_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw value.
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the successor.
            ///
            /// # Panics
            /// Panics at `u64::MAX`.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                assert!(self.0 < u64::MAX, "ID overflow");
                Self(self.0 + 1)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

define_id!(TailerId, "tailer", "Identifier of a tailer handed out by a log manager.");
define_id!(MemberId, "member", "Identifier of a subscribed tailer within a consumer group.");
define_id!(Generation, "gen", "Consumer group generation, bumped on every rebalance.");
