//! Error types for policy validation and cancellable execution.

use thiserror::Error;

/// Rejected [`RetryPolicy`](crate::RetryPolicy) parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The attempt budget was negative.
    #[error("max_attempts must not be negative (got {0})")]
    NegativeMaxAttempts(i64),

    /// The attempt budget does not fit the executor's counter.
    #[error("max_attempts must not exceed {max} (got {got})", max = u32::MAX)]
    MaxAttemptsTooLarge {
        /// Requested budget.
        got: i64,
    },

    /// The first retry delay was zero.
    #[error("initial_delay must be greater than zero")]
    ZeroInitialDelay,

    /// The growth factor was below one, infinite or NaN.
    #[error("backoff_factor must be a finite number >= 1 (got {0})")]
    InvalidBackoffFactor(f64),

    /// The jitter factor was outside `[0, 1]`.
    #[error("jitter must be within [0, 1] (got {0})")]
    InvalidJitter(f64),

    /// The delay cap was smaller than the first delay.
    #[error("max_delay ({max_ms}ms) must not be below initial_delay ({initial_ms}ms)")]
    MaxDelayBelowInitial {
        /// Configured cap in milliseconds.
        max_ms: u128,
        /// Configured first delay in milliseconds.
        initial_ms: u128,
    },
}

/// Failure of a cancellable execution.
///
/// Operation failures are carried untouched in [`RetryError::Operation`] so
/// callers can still branch on the underlying cause.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed and was not retried further.
    #[error("{0}")]
    Operation(E),

    /// The cancellation token tripped before the operation succeeded.
    #[error("operation cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Number of invocations that were started.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Whether execution stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Borrow the operation's failure, if there is one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Operation(error) => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Take the operation's failure, if there is one.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Operation(error) => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// Marker for a wait or an attempt cut short by a cancelled token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("execution cancelled")]
pub struct Cancelled;
