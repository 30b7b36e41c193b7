//! Consumer lag.

use strand_core::LogPartition;

/// Distance between a group's committed offset and the end of a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLag {
    /// The partition measured.
    pub partition: LogPartition,
    /// Committed offset of the group, 0 when nothing was committed.
    pub committed: u64,
    /// Offset one past the last record.
    pub end: u64,
}

impl LogLag {
    /// Creates a lag measurement.
    #[must_use]
    pub const fn new(partition: LogPartition, committed: u64, end: u64) -> Self {
        Self {
            partition,
            committed,
            end,
        }
    }

    /// Returns the number of records not yet committed.
    #[must_use]
    pub const fn lag(&self) -> u64 {
        self.end.saturating_sub(self.committed)
    }

    /// Returns the total lag over several partitions.
    #[must_use]
    pub fn total(lags: &[Self]) -> u64 {
        lags.iter().map(Self::lag).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag() {
        let lags = vec![
            LogLag::new(LogPartition::new("events", 0), 3, 10),
            LogLag::new(LogPartition::new("events", 1), 5, 5),
            LogLag::new(LogPartition::new("events", 2), 0, 4),
        ];
        assert_eq!(lags[0].lag(), 7);
        assert_eq!(lags[1].lag(), 0);
        assert_eq!(LogLag::total(&lags), 11);
    }

    #[test]
    fn test_lag_never_negative() {
        let lag = LogLag::new(LogPartition::new("events", 0), 12, 10);
        assert_eq!(lag.lag(), 0);
    }
}
