//! Bounded retry with fixed or exponential delay

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one (at least 1)
    pub attempts: u32,
    /// Delay after the first failed attempt
    pub delay: Duration,
    /// Multiplier applied to the delay after every further failure (1 = fixed)
    pub factor: u32,
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            factor: 1,
        }
    }

    pub fn backoff(attempts: u32, initial_delay: Duration) -> Self {
        Self {
            attempts,
            delay: initial_delay,
            factor: 2,
        }
    }

    /// Delay to wait after the failed attempt with the given zero-based index
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(attempt);
        self.delay.saturating_mul(multiplier)
    }

    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Run `op` until it succeeds or the policy is exhausted, returning the last error.
///
/// `op` receives the zero-based attempt index.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                debug!(
                    "Attempt {}/{} failed: {}; retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
