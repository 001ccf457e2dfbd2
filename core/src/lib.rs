//! backoff-executor - retry executor with exponential backoff
//!
//! This crate wraps calls to unreliable external services (model providers,
//! voice-call APIs, webhooks) in an attempt loop that waits a geometrically
//! growing delay between failures and gives the caller back the operation's
//! own error once the budget is spent.
//!
//! # Features
//!
//! - **Transparent failures**: the last error is returned as-is, never wrapped
//! - **Error classification**: fatal errors skip the remaining budget
//! - **Optional jitter**: uniform scaling of each delay, off by default
//! - **Cancellation**: a [`CancellationToken`] aborts waits and in-flight calls
//! - **Pluggable observability**: one [`RetryEvent`] per retry to a [`RetrySink`]
//!
//! # Example
//!
//! ```rust
//! use backoff_executor::{RetryPolicy, execute};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0)?;
//!
//! let mut calls = 0;
//! let value = execute(
//!     || {
//!         calls += 1;
//!         let attempt = calls;
//!         async move { if attempt < 2 { Err("busy") } else { Ok(attempt) } }
//!     },
//!     &policy,
//! )
//! .await?;
//! assert_eq!(value, 2);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
pub mod config;
pub mod dsl;
pub mod error;
pub mod observe;
pub mod policy;
pub mod retry;
pub mod sleep;

pub use backoff::Scheduler;
pub use classify::{AlwaysRetry, Classification, Classifier, Predicate};
pub use config::{ConfigError, PolicyConfig, RetryConfig};
pub use dsl::{RegistryError, builder_for_policy, execute_named};
pub use error::{Cancelled, PolicyError, RetryError};
pub use observe::{CollectingSink, NoopSink, RetryEvent, RetrySink, TracingSink};
pub use policy::{
    PolicyRegistry, clear_global_policies, get_global_policy, list_global_policies,
    register_global_policy, remove_global_policy,
};
pub use retry::{RetryBuilder, Retryable, execute};
pub use sleep::{FnSleeper, Sleeper, TokioSleeper};
pub use tokio_util::sync::CancellationToken;

use rand::Rng;
use std::time::Duration;

/// Retry policy configuration
///
/// Immutable description of how many times to retry and how the delay
/// between attempts grows. Construct it through [`RetryPolicy::new`] so the
/// parameters are validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
    jitter: f64,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Default retry budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default delay before the first retry.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
    /// Default growth factor (doubling).
    pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

    /// Create a validated policy.
    ///
    /// `max_attempts` counts retries after the first invocation, so `0`
    /// means exactly one attempt.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::NegativeMaxAttempts`] / [`PolicyError::MaxAttemptsTooLarge`]
    ///   when the budget is out of range
    /// - [`PolicyError::ZeroInitialDelay`] when `initial_delay` is zero
    /// - [`PolicyError::InvalidBackoffFactor`] when the factor is not a finite
    ///   number `>= 1`
    ///
    /// # Example
    ///
    /// ```rust
    /// use backoff_executor::{PolicyError, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(5, Duration::from_millis(100), 2.0).unwrap();
    /// assert_eq!(policy.max_attempts(), 5);
    ///
    /// let err = RetryPolicy::new(-1, Duration::from_millis(100), 2.0).unwrap_err();
    /// assert_eq!(err, PolicyError::NegativeMaxAttempts(-1));
    /// ```
    pub fn new(
        max_attempts: i64,
        initial_delay: Duration,
        backoff_factor: f64,
    ) -> Result<Self, PolicyError> {
        if max_attempts < 0 {
            return Err(PolicyError::NegativeMaxAttempts(max_attempts));
        }
        let max_attempts = u32::try_from(max_attempts)
            .map_err(|_| PolicyError::MaxAttemptsTooLarge { got: max_attempts })?;
        if initial_delay.is_zero() {
            return Err(PolicyError::ZeroInitialDelay);
        }
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(PolicyError::InvalidBackoffFactor(backoff_factor));
        }

        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_factor,
            jitter: 0.0,
            max_delay: None,
        })
    }

    /// Enable jitter (0.0 = no jitter, 1.0 = full jitter).
    ///
    /// Each computed delay is scaled by a uniform factor in `[1 - jitter, 1]`.
    pub fn with_jitter(mut self, jitter: f64) -> Result<Self, PolicyError> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(PolicyError::InvalidJitter(jitter));
        }
        self.jitter = jitter;
        Ok(self)
    }

    /// Cap every computed delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Result<Self, PolicyError> {
        if max_delay < self.initial_delay {
            return Err(PolicyError::MaxDelayBelowInitial {
                max_ms: max_delay.as_millis(),
                initial_ms: self.initial_delay.as_millis(),
            });
        }
        self.max_delay = Some(max_delay);
        Ok(self)
    }

    /// Number of retries allowed after the first invocation.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Multiplier applied to the delay after every retry.
    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Jitter factor, `0.0` when disabled.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Optional delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Calculate the delay before retry number `retry` (0-indexed).
    ///
    /// The base delay is `initial_delay * backoff_factor^retry`, capped at
    /// `max_delay`. Jitter is applied to the capped base and never carried
    /// into the next computation. The RNG is only consulted when jitter is
    /// enabled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use backoff_executor::RetryPolicy;
    /// use rand::SeedableRng;
    /// use rand::rngs::SmallRng;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0).unwrap();
    /// let mut rng = SmallRng::seed_from_u64(7);
    ///
    /// assert_eq!(policy.delay_with_rng(0, &mut rng), Duration::from_millis(100));
    /// assert_eq!(policy.delay_with_rng(2, &mut rng), Duration::from_millis(400));
    /// ```
    pub fn delay_with_rng<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let base = (self.initial_delay.as_nanos() as f64) * self.backoff_factor.powi(exponent);

        let capped = match self.max_delay {
            Some(max) => base.min(max.as_nanos() as f64),
            None => base,
        };

        let scaled = if self.jitter > 0.0 {
            // base * (1 - j + u * j), u in [0, 1]
            let random_scalar: f64 = rng.random_range(0.0..=1.0);
            capped * (1.0 - self.jitter + random_scalar * self.jitter)
        } else {
            capped
        };

        // Float-to-int casts saturate, so an overflowing series stays at u64::MAX nanos.
        Duration::from_nanos(scaled.round() as u64)
    }

    /// Check whether another retry is allowed after `retries_done` retries.
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// `max_attempts = 3`, `initial_delay = 1000ms`, `backoff_factor = 2`,
    /// no jitter, no cap.
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            backoff_factor: Self::DEFAULT_BACKOFF_FACTOR,
            jitter: 0.0,
            max_delay: None,
        }
    }
}
