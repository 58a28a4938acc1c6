//! Exponential backoff retry executor.
//!
//! An operation is retried while it fails with a retryable error and the
//! cumulative time budget allows another attempt. Terminal errors are returned
//! on the spot. Backoff sleeps use `tokio::time`, so they only suspend the task
//! running the retry loop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use alerts_common::error::AlertError;

/// Classifies a failure as worth retrying or not.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AlertError {
    fn is_retryable(&self) -> bool {
        AlertError::is_retryable(self)
    }
}

/// Backoff parameters for one retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Cumulative budget for all attempts and sleeps. Zero disables the limit.
    pub max_elapsed_time: Duration,
    /// Each delay is scaled by a factor drawn from `[1 - r, 1 + r]`.
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_interval: Duration::from_secs(16),
            max_elapsed_time: Duration::from_secs(30),
            randomization_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Default backoff shape with the given elapsed-time budget.
    pub fn with_max_elapsed_time(max_elapsed_time: Duration) -> Self {
        Self {
            max_elapsed_time,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based) for a given jitter
    /// multiplier, capped at `max_interval`.
    pub fn delay(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent) * jitter;
        // f64::min ignores NaN, so an overflowing exponent lands on the cap.
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()).max(0.0))
    }

    /// Delay before retry number `attempt`, randomized by the policy's factor.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = self.randomization_factor.clamp(0.0, 1.0);
        let jitter = if factor == 0.0 {
            1.0
        } else {
            rand::rng().random_range((1.0 - factor)..=(1.0 + factor))
        };
        self.delay(attempt, jitter)
    }

    fn allows(&self, elapsed: Duration, next: Duration) -> bool {
        self.max_elapsed_time.is_zero() || elapsed + next <= self.max_elapsed_time
    }
}

/// A failed attempt, reported before the executor sleeps.
#[derive(Debug)]
pub struct Attempt<'a, E> {
    /// One-based attempt number.
    pub number: u32,
    pub delay: Duration,
    pub error: &'a E,
}

/// Why a retry loop ended without a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation failed with a non-retryable error.
    Terminal(E),
    /// The time budget ran out; `last` is the final retryable error.
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last: E,
    },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Terminal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Terminal(e) => write!(f, "{e}"),
            RetryError::Exhausted {
                attempts,
                elapsed,
                last,
            } => write!(f, "giving up after {attempts} attempts in {elapsed:?}: {last}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    label: &'static str,
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(label: &'static str, policy: RetryPolicy) -> Self {
        Self { label, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_notify(operation, |_| {}).await
    }

    /// Like [`execute`](Self::execute), also handing every failed retryable
    /// attempt to `notify`.
    pub async fn execute_with_notify<T, E, F, Fut, N>(
        &self,
        mut operation: F,
        mut notify: N,
    ) -> Result<T, RetryError<E>>
    where
        E: Retryable + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        N: FnMut(&Attempt<'_, E>),
    {
        let started = Instant::now();
        let mut retries: u32 = 0;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(RetryError::Terminal(error));
            }

            let attempts = retries + 1;
            let delay = self.policy.next_delay(retries);
            let elapsed = started.elapsed();

            if !self.policy.allows(elapsed, delay) {
                tracing::error!(
                    request = self.label,
                    attempts,
                    elapsed_secs = elapsed.as_secs_f64(),
                    error = %error,
                    "Giving up, request failed"
                );
                return Err(RetryError::Exhausted {
                    attempts,
                    elapsed,
                    last: error,
                });
            }

            tracing::warn!(
                request = self.label,
                attempt = attempts,
                delay_secs = delay.as_secs_f64(),
                error = %error,
                "Retrying in {:.1} seconds",
                delay.as_secs_f64()
            );
            notify(&Attempt {
                number: attempts,
                delay,
                error: &error,
            });

            tokio::time::sleep(delay).await;
            retries = attempts;
        }
    }
}

impl RetryError<AlertError> {
    /// Flatten into the shared taxonomy, keeping attempt diagnostics.
    pub fn into_alert_error(self, service: &'static str) -> AlertError {
        match self {
            RetryError::Terminal(error) => error,
            RetryError::Exhausted {
                attempts,
                elapsed,
                last,
            } => AlertError::RetriesExhausted {
                service,
                attempts,
                elapsed,
                source: Box::new(last),
            },
        }
    }
}
