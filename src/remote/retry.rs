//! Retry Policy
//!
//! Bounded retry with exponential backoff for transient backend failures.
//! The delay after the n-th failed attempt is `initial_backoff * 2^(n-1)`,
//! capped at `max_backoff`.

use std::time::Duration;

use super::BackendError;

/// How transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Why a retried call gave up
#[derive(Debug)]
pub enum RetryFailure {
    /// Every attempt failed transiently; carries the last error
    Exhausted { attempts: u32, last: BackendError },
    /// A non-transient failure, returned without retrying
    Permanent(BackendError),
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let shift = failed_attempts.saturating_sub(1).min(16);
        self.initial_backoff
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out
    pub fn run<T>(
        &self,
        what: &str,
        mut call: impl FnMut() -> Result<T, BackendError>,
    ) -> Result<T, RetryFailure> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryFailure::Permanent(e)),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(what, attempts = attempt, "giving up after transient failures: {}", e);
                    return Err(RetryFailure::Exhausted { attempts: attempt, last: e });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying: {}",
                        e
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }
}
