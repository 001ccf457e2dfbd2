//! Delay scheduling between retry attempts
//!
//! The [`Scheduler`] turns a [`RetryPolicy`] into the concrete wait before
//! each retry and performs that wait through a [`Sleeper`]. It is the only
//! place where an execution suspends.

use crate::RetryPolicy;
use crate::sleep::Sleeper;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::time::Duration;

/// Per-execution delay scheduler.
///
/// Owns its RNG, so two executions never share state.
pub struct Scheduler {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    rng: SmallRng,
}

impl Scheduler {
    /// Create a scheduler seeded from the operating system.
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            sleeper,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Create a scheduler with a fixed seed for reproducible jitter.
    pub fn with_seed(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>, seed: u64) -> Self {
        Self {
            policy,
            sleeper,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay(&mut self, retry: u32) -> Duration {
        self.policy.delay_with_rng(retry, &mut self.rng)
    }

    /// Suspend for `delay` through the configured sleeper.
    pub async fn suspend(&self, delay: Duration) {
        self.sleeper.sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleep::{FnSleeper, TokioSleeper};
    use std::sync::Mutex;

    fn policy(max_attempts: i64, initial_ms: u64, factor: f64) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(initial_ms), factor).unwrap()
    }

    #[test]
    fn test_doubling_series() {
        let mut scheduler = Scheduler::with_seed(policy(3, 100, 2.0), Arc::new(TokioSleeper), 1);

        assert_eq!(scheduler.delay(0), Duration::from_millis(100));
        assert_eq!(scheduler.delay(1), Duration::from_millis(200));
        assert_eq!(scheduler.delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let jittered = policy(3, 1000, 2.0).with_jitter(0.5).unwrap();
        let mut a = Scheduler::with_seed(jittered, Arc::new(TokioSleeper), 99);
        let mut b = Scheduler::with_seed(jittered, Arc::new(TokioSleeper), 99);

        for retry in 0..3 {
            assert_eq!(a.delay(retry), b.delay(retry));
        }
    }

    #[tokio::test]
    async fn test_suspend_uses_sleeper() {
        let slept = Arc::new(Mutex::new(Vec::new()));
        let log = slept.clone();
        let sleeper = FnSleeper(move |delay: Duration| log.lock().unwrap().push(delay));
        let scheduler = Scheduler::new(policy(3, 100, 2.0), Arc::new(sleeper));

        scheduler.suspend(Duration::from_millis(250)).await;

        assert_eq!(*slept.lock().unwrap(), vec![Duration::from_millis(250)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_waits_full_delay() {
        let scheduler = Scheduler::new(policy(3, 100, 2.0), Arc::new(TokioSleeper));
        let start = tokio::time::Instant::now();

        scheduler.suspend(Duration::from_millis(300)).await;

        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
