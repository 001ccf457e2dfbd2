//! Failure classification
//!
//! A [`Classifier`] decides whether a failure is worth another attempt.
//! Fatal failures (bad input, rejected credentials) are returned at once
//! without spending the remaining budget.

/// Verdict on a single failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Transient; retry while the budget lasts.
    Retryable,
    /// Permanent; propagate immediately.
    Fatal,
}

/// Decides how a failure of type `E` is handled.
///
/// Implemented for any `Fn(&E) -> Classification`.
///
/// # Example
///
/// ```rust
/// use backoff_executor::{Classification, Classifier};
///
/// #[derive(Debug)]
/// enum ProviderError {
///     Timeout,
///     Unauthorized,
/// }
///
/// let classifier = |e: &ProviderError| match e {
///     ProviderError::Timeout => Classification::Retryable,
///     ProviderError::Unauthorized => Classification::Fatal,
/// };
///
/// assert_eq!(classifier.classify(&ProviderError::Timeout), Classification::Retryable);
/// assert_eq!(classifier.classify(&ProviderError::Unauthorized), Classification::Fatal);
/// ```
pub trait Classifier<E> {
    /// Classify `error`.
    fn classify(&self, error: &E) -> Classification;
}

impl<E, F> Classifier<E> for F
where
    F: Fn(&E) -> Classification,
{
    fn classify(&self, error: &E) -> Classification {
        self(error)
    }
}

/// Treats every failure as retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E> Classifier<E> for AlwaysRetry {
    fn classify(&self, _error: &E) -> Classification {
        Classification::Retryable
    }
}

/// Adapts a boolean predicate: `true` retries, `false` is fatal.
#[derive(Debug, Clone, Copy)]
pub struct Predicate<P>(pub P);

impl<E, P> Classifier<E> for Predicate<P>
where
    P: Fn(&E) -> bool,
{
    fn classify(&self, error: &E) -> Classification {
        if (self.0)(error) {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    #[test]
    fn test_always_retry() {
        assert_eq!(
            Classifier::<TestError>::classify(&AlwaysRetry, &TestError::Permanent),
            Classification::Retryable
        );
    }

    #[test]
    fn test_closure_classifier() {
        let classifier = |e: &TestError| match e {
            TestError::Transient => Classification::Retryable,
            TestError::Permanent => Classification::Fatal,
        };

        assert_eq!(
            classifier.classify(&TestError::Transient),
            Classification::Retryable
        );
        assert_eq!(
            classifier.classify(&TestError::Permanent),
            Classification::Fatal
        );
    }

    #[test]
    fn test_predicate_classifier() {
        let classifier = Predicate(|e: &TestError| matches!(e, TestError::Transient));

        assert_eq!(
            classifier.classify(&TestError::Transient),
            Classification::Retryable
        );
        assert_eq!(
            classifier.classify(&TestError::Permanent),
            Classification::Fatal
        );
    }
}
