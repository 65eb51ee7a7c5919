//! Retry configuration.
//!
//! [`RetryConfig`] is plain data: it describes how many attempts an executor
//! may make, and nothing else. Backoff and jitter are intentionally absent;
//! the executor retries immediately after a successful reconnect.

use std::num::NonZeroU32;

/// Number of operation attempts an executor makes when no limit is configured.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

pub(crate) const DEFAULT_LIMIT: NonZeroU32 = NonZeroU32::MIN.saturating_add(DEFAULT_RETRY_LIMIT - 1);

/// Clamp a caller-supplied limit into a usable attempt count.
///
/// Zero and negative values fall back to [`DEFAULT_RETRY_LIMIT`]; values past
/// `u32::MAX` saturate.
pub(crate) fn clamp_limit(limit: i64) -> NonZeroU32 {
    if limit <= 0 {
        return DEFAULT_LIMIT;
    }
    let limit = u32::try_from(limit).unwrap_or(u32::MAX);
    NonZeroU32::new(limit).unwrap_or(DEFAULT_LIMIT)
}

/// Configuration for a [`RetryExecutor`](crate::RetryExecutor).
///
/// With the `serde` feature enabled this can be embedded in an application's
/// own configuration file. Missing fields take their defaults, and a
/// deserialized limit of `0` is treated like any other non-positive limit.
///
/// # Examples
///
/// ```rust
/// use connretry::RetryConfig;
///
/// assert_eq!(RetryConfig::default().retry_limit, 3);
/// assert_eq!(RetryConfig::new(5).retry_limit, 5);
///
/// // Non-positive limits are reset rather than rejected
/// assert_eq!(RetryConfig::new(0).retry_limit, 3);
/// assert_eq!(RetryConfig::new(-7).retry_limit, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    /// Maximum number of operation attempts per `exec_with_retry` call.
    pub retry_limit: u32,
}

impl RetryConfig {
    /// Create a config, resetting non-positive limits to the default.
    pub fn new(retry_limit: i64) -> Self {
        Self {
            retry_limit: clamp_limit(retry_limit).get(),
        }
    }

    /// The attempt count an executor will actually use.
    pub fn effective_limit(&self) -> NonZeroU32 {
        NonZeroU32::new(self.retry_limit).unwrap_or(DEFAULT_LIMIT)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}
