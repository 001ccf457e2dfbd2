//! Retry executor with fluent builder API
//!
//! This module drives the attempt loop: invoke the operation, and on failure
//! either propagate the error or report the retry, wait, and invoke again.
//! The loop is iterative, so large budgets never deepen the call stack.

use crate::RetryPolicy;
use crate::backoff::Scheduler;
use crate::classify::{AlwaysRetry, Classification, Classifier, Predicate};
use crate::error::{Cancelled, RetryError};
use crate::observe::{RetryEvent, RetrySink, TracingSink};
use crate::sleep::{Sleeper, TokioSleeper};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run `operation` under `policy` with the default collaborators.
///
/// The policy is copied before the first attempt, so the returned future
/// does not borrow it. Every failure is retryable, retries are logged through [`TracingSink`]
/// and waits use [`TokioSleeper`]. Once the budget is spent the error of the
/// last attempt is returned unchanged.
///
/// # Example
///
/// ```rust
/// use backoff_executor::{RetryPolicy, execute};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(0, Duration::from_millis(1000), 2.0).unwrap();
/// let result: Result<(), &str> = execute(|| async { Err("boom") }, &policy).await;
/// assert_eq!(result, Err("boom"));
/// # }
/// ```
pub fn execute<F, Fut, T, E>(
    operation: F,
    policy: &RetryPolicy,
) -> impl Future<Output = Result<T, E>> + use<F, Fut, T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let policy = *policy;
    RetryBuilder::new(operation, policy).call()
}

/// Extension trait that adds `.retry()` to async closures
///
/// Implemented for every `FnMut() -> impl Future<Output = Result<T, E>>`.
///
/// # Example
///
/// ```rust
/// use backoff_executor::{Retryable, RetryPolicy};
///
/// async fn fetch_embedding() -> Result<Vec<f32>, std::io::Error> {
///     Ok(vec![0.1, 0.2])
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), std::io::Error> {
/// let embedding = fetch_embedding
///     .retry(RetryPolicy::default())
///     .call()
///     .await?;
/// assert_eq!(embedding.len(), 2);
/// # Ok(())
/// # }
/// ```
pub trait Retryable<T, E> {
    /// Begin building a retry execution governed by `policy`.
    fn retry(self, policy: RetryPolicy) -> RetryBuilder<Self>
    where
        Self: Sized;
}

impl<F, Fut, T, E> Retryable<T, E> for F
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    fn retry(self, policy: RetryPolicy) -> RetryBuilder<Self> {
        RetryBuilder::new(self, policy)
    }
}

/// Builder for configuring and executing retry operations
///
/// # Type Parameters
///
/// * `F` - The operation type
/// * `C` - The failure classifier type
pub struct RetryBuilder<F, C = AlwaysRetry> {
    operation: F,
    policy: RetryPolicy,
    classifier: C,
    sink: Arc<dyn RetrySink>,
    sleeper: Arc<dyn Sleeper>,
    seed: Option<u64>,
}

impl<F> RetryBuilder<F, AlwaysRetry> {
    /// Wrap `operation` with the default classifier, sink and sleeper.
    pub fn new(operation: F, policy: RetryPolicy) -> Self {
        Self {
            operation,
            policy,
            classifier: AlwaysRetry,
            sink: Arc::new(TracingSink),
            sleeper: Arc::new(TokioSleeper),
            seed: None,
        }
    }
}

impl<F, C> RetryBuilder<F, C> {
    /// Decide per failure whether to retry.
    ///
    /// Failures classified [`Classification::Fatal`] are returned immediately,
    /// without a retry event and regardless of the remaining budget.
    pub fn classify<K>(self, classifier: K) -> RetryBuilder<F, K> {
        RetryBuilder {
            operation: self.operation,
            policy: self.policy,
            classifier,
            sink: self.sink,
            sleeper: self.sleeper,
            seed: self.seed,
        }
    }

    /// Retry only failures for which `predicate` returns `true`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use backoff_executor::{Retryable, RetryPolicy};
    ///
    /// #[derive(Debug, PartialEq)]
    /// enum ApiError {
    ///     Timeout,
    ///     Unauthorized,
    /// }
    ///
    /// impl std::fmt::Display for ApiError {
    ///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "{:?}", self)
    ///     }
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let result: Result<(), ApiError> = (|| async { Err(ApiError::Unauthorized) })
    ///     .retry(RetryPolicy::default())
    ///     .when(|e: &ApiError| matches!(e, ApiError::Timeout))
    ///     .call()
    ///     .await;
    /// assert_eq!(result, Err(ApiError::Unauthorized));
    /// # }
    /// ```
    pub fn when<P>(self, predicate: P) -> RetryBuilder<F, Predicate<P>> {
        self.classify(Predicate(predicate))
    }

    /// Send retry events to `sink` instead of the tracing log.
    pub fn sink(mut self, sink: Arc<dyn RetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Wait between attempts with `sleeper`.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Seed the jitter RNG for reproducible delays.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Policy this execution runs under.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute until success, a fatal failure, or exhaustion.
    ///
    /// The returned error is the operation's own failure, untouched.
    pub async fn call<Fut, T, E>(self) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: Classifier<E>,
    {
        match self.drive(&Uninterruptible).await {
            Ok(value) => Ok(value),
            Err(Halt::Failed(error)) => Err(error),
            Err(Halt::Stopped { reason, .. }) => match reason {},
        }
    }

    /// Execute like [`call`](Self::call), aborting when `token` is cancelled.
    ///
    /// The token is checked before every invocation and raced against both
    /// the in-flight operation and every wait. Cancellation yields
    /// [`RetryError::Cancelled`]; operation failures come back in
    /// [`RetryError::Operation`].
    pub async fn call_cancellable<Fut, T, E>(
        self,
        token: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: Classifier<E>,
    {
        self.drive(token).await.map_err(|halt| match halt {
            Halt::Failed(error) => RetryError::Operation(error),
            Halt::Stopped { attempts, .. } => RetryError::Cancelled { attempts },
        })
    }

    async fn drive<K, Fut, T, E>(mut self, interrupt: &K) -> Result<T, Halt<E, K::Reason>>
    where
        K: Interrupt,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        C: Classifier<E>,
    {
        let mut scheduler = match self.seed {
            Some(seed) => Scheduler::with_seed(self.policy, self.sleeper.clone(), seed),
            None => Scheduler::new(self.policy, self.sleeper.clone()),
        };
        let mut attempts_remaining = self.policy.max_attempts();
        let mut retry = 0u32;
        let mut attempt = 0u32;

        loop {
            if let Err(reason) = interrupt.check() {
                return Err(stopped(reason, attempt));
            }
            attempt = attempt.saturating_add(1);

            let outcome = match interrupt.race((self.operation)()).await {
                Ok(outcome) => outcome,
                Err(reason) => return Err(stopped(reason, attempt)),
            };

            let next_delay = {
                let error = match outcome {
                    Ok(value) => return Ok(value),
                    Err(error) => error,
                };

                if attempts_remaining == 0
                    || self.classifier.classify(&error) == Classification::Fatal
                {
                    return Err(Halt::Failed(error));
                }

                let next_delay = scheduler.delay(retry);
                self.sink.record(&RetryEvent {
                    attempt,
                    attempts_remaining,
                    next_delay,
                    failure_summary: error.to_string(),
                });
                next_delay
            };

            if let Err(reason) = interrupt.race(scheduler.suspend(next_delay)).await {
                return Err(stopped(reason, attempt));
            }
            attempts_remaining -= 1;
            retry += 1;
        }
    }
}

/// Why an execution ended without a value.
enum Halt<E, R> {
    Failed(E),
    Stopped { reason: R, attempts: u32 },
}

fn stopped<E, R>(reason: R, attempts: u32) -> Halt<E, R> {
    tracing::debug!(attempts, "retry execution cancelled");
    Halt::Stopped { reason, attempts }
}

/// Source of cancellation an execution listens to.
///
/// `Reason` is uninhabited for executions that cannot be interrupted.
trait Interrupt {
    type Reason;

    /// Fails once the execution must not start another step.
    fn check(&self) -> Result<(), Self::Reason>;

    /// Run `work` to completion unless interrupted first.
    async fn race<O>(&self, work: impl Future<Output = O>) -> Result<O, Self::Reason>;
}

struct Uninterruptible;

impl Interrupt for Uninterruptible {
    type Reason = Infallible;

    fn check(&self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn race<O>(&self, work: impl Future<Output = O>) -> Result<O, Infallible> {
        Ok(work.await)
    }
}

impl Interrupt for CancellationToken {
    type Reason = Cancelled;

    fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    // A token that is already cancelled wins without polling `work`.
    async fn race<O>(&self, work: impl Future<Output = O>) -> Result<O, Cancelled> {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Cancelled),
            output = work => Ok(output),
        }
    }
}
