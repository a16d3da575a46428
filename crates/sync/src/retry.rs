use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RemoteError;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least one is always made.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Why a retried call stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub error: RemoteError,
    pub attempts: u32,
    /// True when the attempt budget ran out on a retryable error.
    pub exhausted: bool,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Returns the value with the attempt count.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<(T, u32), RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok((value, attempt + 1)),
                Err(error) => {
                    let attempts = attempt + 1;
                    if !error.is_retryable() {
                        warn!(label, attempt = attempts, %error, "non-retryable sync failure");
                        return Err(RetryFailure {
                            error,
                            attempts,
                            exhausted: false,
                        });
                    }
                    if attempts >= max {
                        return Err(RetryFailure {
                            error,
                            attempts,
                            exhausted: true,
                        });
                    }
                    let delay = self.delay_for(attempt);
                    warn!(label, attempt = attempts, ?delay, %error, "sync attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
