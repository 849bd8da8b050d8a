//! Cache configuration

use std::time::Duration;

/// Freshness and eviction settings for the query cache.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use catalog_lib::cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_stale_time(Duration::from_secs(60))
///     .with_refetch_on_focus(false);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched value counts as fresh.
    ///
    /// Reads of a fresh entry never touch the network. Older entries are
    /// served as-is while a background revalidation runs.
    ///
    /// Default: 5 minutes
    pub stale_time: Duration,

    /// How long an entry stays in memory after it was last read or written.
    ///
    /// Default: 10 minutes
    pub gc_time: Duration,

    /// Revalidate stale entries when the window regains focus.
    ///
    /// Default: `true`
    pub refetch_on_focus: bool,

    /// Revalidate stale entries when network connectivity returns.
    ///
    /// Default: `true`
    pub refetch_on_reconnect: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300), // 5 minutes
            gc_time: Duration::from_secs(600),    // 10 minutes
            refetch_on_focus: true,
            refetch_on_reconnect: true,
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the freshness window.
    pub fn with_stale_time(mut self, ttl: Duration) -> Self {
        self.stale_time = ttl;
        self
    }

    /// Sets the eviction window.
    pub fn with_gc_time(mut self, ttl: Duration) -> Self {
        self.gc_time = ttl;
        self
    }

    /// Enables or disables revalidation on focus.
    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    /// Enables or disables revalidation on reconnect.
    pub fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
        self.refetch_on_reconnect = enabled;
        self
    }

    /// Creates a config where every entry is immediately stale.
    ///
    /// Cached values are still served while revalidating.
    pub fn no_cache() -> Self {
        Self {
            stale_time: Duration::ZERO,
            ..Self::default()
        }
    }
}
