//! Cache-wide configuration and per-fetch options.

use std::time::Duration;

/// Configuration for the query cache.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Freshness window used when a fetch does not specify one.
    pub default_stale_time: Duration,
    /// How long an entry with no subscribers survives before eviction.
    pub gc_time: Duration,
    /// Extra attempts made after a failed read before the error surfaces.
    pub read_retries: u32,
    /// Pause between a failed read and its retry.
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(5 * 60),
            read_retries: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_time(mut self, duration: Duration) -> Self {
        self.default_stale_time = duration;
        self
    }

    pub fn with_gc_time(mut self, duration: Duration) -> Self {
        self.gc_time = duration;
        self
    }

    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Options supplied with a single `fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Overrides [`QueryConfig::default_stale_time`] when set.
    pub stale_time: Option<Duration>,
    /// A disabled fetch registers the subscriber but never calls the loader.
    pub enabled: bool,
    /// Refetch on this interval while the key has subscribers.
    pub refetch_interval: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            stale_time: None,
            enabled: true,
            refetch_interval: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stale_time(mut self, duration: Duration) -> Self {
        self.stale_time = Some(duration);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_config_builder() {
        let config = QueryConfig::new()
            .with_stale_time(Duration::from_secs(30))
            .with_gc_time(Duration::from_secs(10))
            .with_read_retries(0)
            .with_retry_delay(Duration::from_millis(5));

        assert_eq!(config.default_stale_time, Duration::from_secs(30));
        assert_eq!(config.gc_time, Duration::from_secs(10));
        assert_eq!(config.read_retries, 0);
        assert_eq!(config.retry_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_default_retries_once() {
        let config = QueryConfig::default();
        assert_eq!(config.read_retries, 1);
        assert_eq!(config.default_stale_time, Duration::ZERO);
    }

    #[test]
    fn test_fetch_options_default_enabled() {
        let options = FetchOptions::default();
        assert!(options.enabled);
        assert_eq!(options.stale_time, None);
        assert_eq!(options.refetch_interval, None);
    }
}
