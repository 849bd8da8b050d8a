//! Retry configuration for read requests.
//!
//! Writes are never retried; reads get at most `max_retries` silent retries.

use std::time::Duration;

use crate::error::ApiError;

/// Configuration for automatic retry of failed reads.
///
/// Controls how the query client handles transient failures such as rate
/// limiting (429), server errors (5xx), and network errors.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use catalog_lib::retry::RetryConfig;
///
/// // Default: one retry after one second
/// let config = RetryConfig::default();
///
/// // Custom configuration
/// let custom = RetryConfig::default()
///     .max_retries(3)
///     .initial_delay(Duration::from_millis(500))
///     .max_delay(Duration::from_secs(10));
///
/// // Disable all retries
/// let no_retry = RetryConfig::no_retry();
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt).
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Whether to retry on HTTP 429 (rate limited).
    pub retry_on_429: bool,
    /// Whether to retry on HTTP 5xx (server errors).
    pub retry_on_5xx: bool,
    /// Whether to retry on network errors and timeouts.
    pub retry_on_network: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retry_on_429: true,
            retry_on_5xx: true,
            retry_on_network: true,
        }
    }
}

impl RetryConfig {
    /// Creates a config with all retries disabled.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retry_on_429: false,
            retry_on_5xx: false,
            retry_on_network: false,
            ..Default::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Sets the initial delay between retries.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables retry on HTTP 429.
    pub fn retry_on_429(mut self, enabled: bool) -> Self {
        self.retry_on_429 = enabled;
        self
    }

    /// Enables or disables retry on HTTP 5xx.
    pub fn retry_on_5xx(mut self, enabled: bool) -> Self {
        self.retry_on_5xx = enabled;
        self
    }

    /// Enables or disables retry on network errors.
    pub fn retry_on_network(mut self, enabled: bool) -> Self {
        self.retry_on_network = enabled;
        self
    }

    /// Decides whether a failed read should be attempted again.
    ///
    /// `attempt` is the number of retries already made.
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        if attempt >= self.max_retries || !error.is_retryable() {
            return false;
        }
        match error {
            ApiError::Http { status: 429, .. } => self.retry_on_429,
            ApiError::Http { status, .. } if *status >= 500 => self.retry_on_5xx,
            ApiError::Http { .. } => true,
            ApiError::Network(_) | ApiError::Timeout(_) => self.retry_on_network,
            _ => false,
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retries_once() {
        let config = RetryConfig::default();
        let err = ApiError::http(503, "unavailable");
        assert!(config.should_retry(&err, 0));
        assert!(!config.should_retry(&err, 1));
    }

    #[test]
    fn test_never_retries_client_errors() {
        let config = RetryConfig::default().max_retries(5);
        assert!(!config.should_retry(&ApiError::not_found("product 9"), 0));
        assert!(!config.should_retry(&ApiError::rejected(400, "bad"), 0));
        assert!(!config.should_retry(&ApiError::parse("junk"), 0));
    }

    #[test]
    fn test_flags_disable_categories() {
        let config = RetryConfig::default().retry_on_5xx(false);
        assert!(!config.should_retry(&ApiError::http(500, ""), 0));
        assert!(config.should_retry(&ApiError::http(429, ""), 0));
        assert!(config.should_retry(&ApiError::Timeout(Duration::from_secs(5)), 0));
        assert!(!RetryConfig::no_retry().should_retry(&ApiError::http(429, ""), 0));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig::default().max_delay(Duration::from_secs(5));
        assert_eq!(config.delay_for(0), Duration::from_secs(1));
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(5));
        assert_eq!(config.delay_for(40), Duration::from_secs(5));
    }
}
