//! In-memory store configuration.

use std::time::Duration;

use strand_core::Limits;

/// Configuration for [`MemoryLogStore`](super::MemoryLogStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Whether consumer-group subscriptions are available.
    pub supports_subscribe: bool,
    /// Upper bound on a single rebalance listener callback.
    pub listener_timeout: Duration,
    /// Limits applied when creating logs.
    pub limits: Limits,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            supports_subscribe: true,
            listener_timeout: Duration::from_secs(5),
            limits: Limits::new(),
        }
    }
}

impl MemoryStoreConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables subscriptions.
    #[must_use]
    pub const fn with_subscribe(mut self, enabled: bool) -> Self {
        self.supports_subscribe = enabled;
        self
    }

    /// Sets the rebalance listener timeout.
    #[must_use]
    pub const fn with_listener_timeout(mut self, timeout: Duration) -> Self {
        self.listener_timeout = timeout;
        self
    }

    /// Sets the limits applied when creating logs.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = MemoryStoreConfig::new()
            .with_subscribe(false)
            .with_listener_timeout(Duration::from_millis(50));
        assert!(!config.supports_subscribe);
        assert_eq!(config.listener_timeout, Duration::from_millis(50));
        assert_eq!(config.limits, Limits::new());
    }
}
