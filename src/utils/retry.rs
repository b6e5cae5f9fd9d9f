//! Retry utilities for bounded-attempt operations
//!
//! This module provides the attempt loop used by the heavy probe tier:
//! a fixed attempt budget, an optional exponential delay between attempts,
//! and a predicate deciding which errors deserve another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one (minimum 1)
    pub max_attempts: u32,

    /// Base delay in milliseconds before the second attempt (0 = retry immediately)
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 0,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with a custom attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Calculate delay before a given attempt (1-based) using exponential backoff
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt <= 1 || self.base_delay_ms == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 2) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }
}

/// Result of a retried operation together with the number of attempts made
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Execute an operation with a bounded attempt budget and a retry predicate
///
/// The operation receives the 1-based attempt number. An error for which
/// `should_retry` returns `false` is returned immediately; otherwise the
/// operation runs again while attempts remain.
///
/// # Example
///
/// ```no_run
/// use sentinela::utils::retry::{with_retry_if, RetryConfig};
///
/// # async fn example() {
/// let config = RetryConfig::new(3);
/// let attempted = with_retry_if(
///     &config,
///     |attempt| async move {
///         if attempt < 2 { Err("transient") } else { Ok(attempt) }
///     },
///     |e: &&str| *e == "transient",
/// )
/// .await;
/// assert_eq!(attempted.attempts, 2);
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Attempted<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if attempt > 1 {
            let delay = config.calculate_delay(attempt);
            if !delay.is_zero() {
                debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying operation after delay"
                );
                tokio::time::sleep(delay).await;
            }
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) => {
                if !should_retry(&e) {
                    debug!(attempt = attempt, error = %e, "Non-retryable error encountered");
                    return Attempted {
                        result: Err(e),
                        attempts: attempt,
                    };
                }

                if attempt >= max_attempts {
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        "Attempts exhausted"
                    );
                    return Attempted {
                        result: Err(e),
                        attempts: attempt,
                    };
                }

                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %e,
                    "Operation failed, will retry"
                );
                attempt += 1;
            }
        }
    }
}
