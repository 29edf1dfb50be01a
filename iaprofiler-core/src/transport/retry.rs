//! Pluggable retry policies for catalog requests.
//!
//! The default is [`NoRetry`]: the first connection failure or non-2xx status
//! aborts the operation. [`ExponentialBackoff`] is opt-in for callers facing
//! a flaky catalog service.

use std::time::Duration;

/// What went wrong with a single request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFailure {
    /// No HTTP response was received (connect error, reset, timeout)
    Connection,
    /// The catalog answered with this non-2xx status
    Status(u16),
}

impl RequestFailure {
    /// Failures worth another attempt: connection errors, 429 and 5xx.
    pub fn is_transient(self) -> bool {
        match self {
            Self::Connection => true,
            Self::Status(status) => status == 429 || status >= 500,
        }
    }
}

/// Strategy deciding whether and when a failed request is retried.
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Returns the delay before retry number `attempt` (starting at 1), or
    /// `None` to give up and surface the failure.
    fn next_delay(&self, attempt: u32, failure: RequestFailure) -> Option<Duration>;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _failure: RequestFailure) -> Option<Duration> {
        None
    }
}

/// Retries transient failures with exponentially growing delays.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Growth factor applied per retry
    pub multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            max_retries: 3,
            multiplier: 2.0,
        }
    }
}

impl ExponentialBackoff {
    /// Creates a backoff policy with the given retry budget and default delays.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32, failure: RequestFailure) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries || !failure.is_transient() {
            return None;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(0.0)))
    }
}
