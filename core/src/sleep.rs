//! Sleep abstraction
//!
//! The executor never blocks a thread while waiting between attempts. This
//! module provides the trait used for that wait and the implementations the
//! crate ships with:
//! - [`TokioSleeper`], a timer-based `tokio::time::sleep` (the default)
//! - [`FnSleeper`], a callback that returns immediately (tests, dry runs)

use async_trait::async_trait;
use std::time::Duration;

/// Trait for non-blocking sleep implementations
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current task for `delay`.
    async fn sleep(&self, delay: Duration);
}

/// Tokio timer sleeper
///
/// # Example
///
/// ```rust
/// use backoff_executor::sleep::{Sleeper, TokioSleeper};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// TokioSleeper.sleep(Duration::from_millis(1)).await;
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Callback sleeper
///
/// Hands the requested delay to a closure and returns without waiting.
/// Useful for recording the delay series in tests.
///
/// # Example
///
/// ```rust
/// use backoff_executor::sleep::FnSleeper;
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let sleeper = FnSleeper(move |delay: std::time::Duration| log.lock().unwrap().push(delay));
/// # let _ = sleeper;
/// ```
#[derive(Clone, Copy)]
pub struct FnSleeper<F>(pub F);

#[async_trait]
impl<F> Sleeper for FnSleeper<F>
where
    F: Fn(Duration) + Send + Sync,
{
    async fn sleep(&self, delay: Duration) {
        (self.0)(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(10)).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_fn_sleeper() {
        let total = AtomicU64::new(0);
        let sleeper = FnSleeper(|delay: Duration| {
            total.fetch_add(delay.as_millis() as u64, Ordering::SeqCst);
        });

        sleeper.sleep(Duration::from_millis(100)).await;
        sleeper.sleep(Duration::from_millis(200)).await;

        assert_eq!(total.load(Ordering::SeqCst), 300);
    }
}
