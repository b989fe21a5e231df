// Path: crates/observer/src/retry.rs
//! Bounded retries for fallible async calls.

use observer_types::error::ObserverError;
use observer_types::Result;
use std::future::Future;
use tokio::time::{sleep, Duration};

/// How long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay after every failed attempt.
    Fixed(Duration),
    /// `base * 2^attempt`, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        base: Duration,
        /// Upper bound on any single delay.
        max: Duration,
    },
}

/// A retry budget for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` tries separated by `delay`.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// `max_attempts` tries with doubling delays starting at `base`.
    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, max },
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => base
                .saturating_mul(1u32 << attempt.min(16))
                .min(max),
        }
    }

    /// Runs `op` until it succeeds or the budget is spent.
    ///
    /// Exhausting the budget yields `MaxRetriesExceeded` carrying the last
    /// error's message.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 0..attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        let delay = self.delay(attempt);
                        tracing::warn!(
                            target: "retry",
                            label,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "attempt failed, retrying"
                        );
                        sleep(delay).await;
                    }
                }
            }
        }
        Err(ObserverError::MaxRetriesExceeded {
            attempts,
            last_error,
        })
    }
}
