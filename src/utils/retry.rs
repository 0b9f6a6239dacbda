//! Bounded retry combinator.
//!
//! Runs a fallible operation up to a fixed number of attempts, sleeping
//! between attempts according to a [`Backoff`] and stopping early on the
//! first success or the first error the caller does not consider retryable.
//! Waits are real blocking sleeps on the calling thread.

use std::thread;
use std::time::Duration;

use tracing::debug;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Treated as at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// `retries` extra attempts after the first, without delay.
    pub fn immediate(retries: u32) -> Self {
        Self::new(retries.saturating_add(1), Backoff::None)
    }
}

/// Run `op` under `policy`.
///
/// `op` receives the 1-based attempt number. An error for which
/// `is_retryable` returns `false` is returned at once; otherwise the last
/// error is returned once the attempts are exhausted.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use plugctl::utils::retry::{retry, Backoff, RetryPolicy};
///
/// let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(1)));
/// let result: Result<u32, &str> = retry(policy, |_| true, |attempt| {
///     if attempt < 3 { Err("not yet") } else { Ok(attempt) }
/// });
/// assert_eq!(result, Ok(3));
/// ```
pub fn retry<T, E, R, F>(policy: RetryPolicy, is_retryable: R, mut op: F) -> Result<T, E>
where
    R: Fn(&E) -> bool,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= max_attempts || !is_retryable(&e) {
                    return Err(e);
                }
                let delay = policy.backoff.delay(attempt);
                debug!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, "Retrying");
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}
