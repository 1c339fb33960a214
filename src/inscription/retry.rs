//! Bounded retry with a fixed delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause between consecutive attempts. None before the first.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: Self::DEFAULT_ATTEMPTS, delay: Self::DEFAULT_DELAY }
    }
}

/// Every attempt failed; carries the error of the last one.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(5000);

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Run `op` until it succeeds or `max_attempts` (at least one) are used up.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    debug!(attempt, "attempt succeeded");
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(attempt, max_attempts, error = %e, "attempt failed, giving up");
                    return Err(RetryExhausted { attempts: attempt, last_error: e });
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, retry_in_ms = self.delay.as_millis() as u64, "attempt failed");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(5000));
        assert_eq!(RetryPolicy::immediate(3).delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_attempt() {
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let result = RetryPolicy::default()
            .run(|attempt| {
                calls.set(calls.get() + 1);
                async move { if attempt < 5 { Err("not yet") } else { Ok(attempt) } }
            })
            .await;
        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls.get(), 5);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_short_circuits() {
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let result: Result<&str, RetryExhausted<&str>> = RetryPolicy::default()
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Ok("done") }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_keeps_last_error() {
        let result: Result<(), _> =
            RetryPolicy::default().run(|attempt| async move { Err(format!("failure {attempt}")) }).await;
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 5);
        assert_eq!(exhausted.last_error, "failure 5");
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0u32);
        let result: Result<(), _> = RetryPolicy::immediate(0)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err("nope") }
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.get(), 1);
    }
}
