//! System limits and configuration bounds.
//!
//! Following TigerStyle: put limits on everything.
//! Every log, name and tailer assignment has an explicit maximum size.

use crate::error::{CoreError, CoreResult};

/// Limits applied by a log manager and its backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of partitions in a single log.
    pub log_partitions_max: u32,
    /// Maximum length of a log name in bytes.
    pub log_name_length_max: u32,
    /// Maximum length of a consumer group name in bytes.
    pub group_name_length_max: u32,
    /// Maximum number of partitions a single tailer may be assigned.
    pub tailer_partitions_max: u32,
}

impl Limits {
    /// Creates limits with safe defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log_partitions_max: 1024,
            log_name_length_max: 249,
            group_name_length_max: 249,
            tailer_partitions_max: 4096,
        }
    }

    /// Validates that all limits are internally consistent.
    ///
    /// # Errors
    /// Returns an error if any limit is zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.log_partitions_max == 0 {
            return Err(CoreError::InvalidArgument {
                name: "log_partitions_max",
                reason: "must be positive".into(),
            });
        }
        if self.log_name_length_max == 0 || self.group_name_length_max == 0 {
            return Err(CoreError::InvalidArgument {
                name: "name_length_max",
                reason: "must be positive".into(),
            });
        }
        if self.tailer_partitions_max == 0 {
            return Err(CoreError::InvalidArgument {
                name: "tailer_partitions_max",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Checks a log name against the naming rules.
    ///
    /// Names are non-empty and made of ASCII alphanumerics, `-`, `_` and `.`.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long or has other characters.
    pub fn check_log_name(&self, name: &str) -> CoreResult<()> {
        check_name("log_name", name, self.log_name_length_max)
    }

    /// Checks a consumer group name against the naming rules.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long or has other characters.
    pub fn check_group_name(&self, group: &str) -> CoreResult<()> {
        check_name("group", group, self.group_name_length_max)
    }

    /// Checks a requested partition count.
    ///
    /// # Errors
    /// Returns an error if the count is zero or above `log_partitions_max`.
    pub fn check_partition_count(&self, partitions: u32) -> CoreResult<()> {
        if partitions == 0 {
            return Err(CoreError::InvalidArgument {
                name: "partitions",
                reason: "must be positive".into(),
            });
        }
        if partitions > self.log_partitions_max {
            return Err(CoreError::LimitExceeded {
                limit: "log_partitions_max",
                max: u64::from(self.log_partitions_max),
                actual: u64::from(partitions),
            });
        }
        Ok(())
    }

    /// Checks the number of partitions requested for a single tailer.
    ///
    /// # Errors
    /// Returns an error if no partition is requested or too many are.
    pub fn check_tailer_assignment(&self, count: usize) -> CoreResult<()> {
        if count == 0 {
            return Err(CoreError::InvalidArgument {
                name: "partitions",
                reason: "a tailer needs at least one partition".into(),
            });
        }
        if count > self.tailer_partitions_max as usize {
            return Err(CoreError::LimitExceeded {
                limit: "tailer_partitions_max",
                max: u64::from(self.tailer_partitions_max),
                actual: count as u64,
            });
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(kind: &'static str, name: &str, max: u32) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidArgument {
            name: kind,
            reason: "must not be empty".into(),
        });
    }
    if name.len() > max as usize {
        return Err(CoreError::LimitExceeded {
            limit: "name_length_max",
            max: u64::from(max),
            actual: name.len() as u64,
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(CoreError::InvalidArgument {
            name: kind,
            reason: format!("invalid character {c:?} in {name:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_are_valid() {
        assert!(Limits::new().validate().is_ok());
    }

    #[test]
    fn test_zero_partitions_max_is_invalid() {
        let mut limits = Limits::new();
        limits.log_partitions_max = 0;
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_partition_count_bounds() {
        let limits = Limits::new();
        assert!(limits.check_partition_count(1).is_ok());
        assert!(limits.check_partition_count(1024).is_ok());
        assert!(matches!(
            limits.check_partition_count(0),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            limits.check_partition_count(1025),
            Err(CoreError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn test_log_names() {
        let limits = Limits::new();
        assert!(limits.check_log_name("events").is_ok());
        assert!(limits.check_log_name("audit.v2-in_flight").is_ok());
        assert!(limits.check_log_name("").is_err());
        assert!(limits.check_log_name("with space").is_err());
        assert!(limits.check_log_name("slash/name").is_err());
        assert!(limits.check_log_name(&"x".repeat(250)).is_err());
    }

    #[test]
    fn test_tailer_assignment_bounds() {
        let limits = Limits::new();
        assert!(limits.check_tailer_assignment(0).is_err());
        assert!(limits.check_tailer_assignment(3).is_ok());
        assert!(limits.check_tailer_assignment(5000).is_err());
    }
}
