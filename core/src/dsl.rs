//! Run operations under a policy looked up by name.
//!
//! These helpers resolve names against the global registry (see
//! [`crate::policy`]), so a call site only has to say which provider it talks
//! to.

use crate::policy::get_global_policy;
use crate::retry::RetryBuilder;
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Errors produced by the named-policy helpers.
#[derive(Debug, Error)]
pub enum RegistryError<E> {
    /// Referenced policy name is missing from the global registry.
    #[error("retry policy '{0}' is not registered")]
    PolicyMissing(String),
    /// The operation failed; carries its last error unchanged.
    #[error("{0}")]
    Operation(E),
}

/// Construct a [`RetryBuilder`] using a named policy from the global registry.
///
/// The builder can then be customised (classifier, sink, cancellation)
/// before it is run.
pub fn builder_for_policy<F, E>(
    policy_name: &str,
    operation: F,
) -> Result<RetryBuilder<F>, RegistryError<E>> {
    let policy = get_global_policy(policy_name)
        .ok_or_else(|| RegistryError::PolicyMissing(policy_name.to_string()))?;

    Ok(RetryBuilder::new(operation, policy))
}

/// Execute an operation using a named policy from the global registry.
///
/// # Example
///
/// ```rust
/// use backoff_executor::{RetryPolicy, execute_named, register_global_policy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// register_global_policy(
///     "voice-calls",
///     RetryPolicy::new(2, Duration::from_millis(5), 2.0).unwrap(),
/// );
///
/// let calls = execute_named("voice-calls", || async { Ok::<_, String>(vec!["call-1"]) })
///     .await
///     .unwrap();
/// assert_eq!(calls, vec!["call-1"]);
/// # }
/// ```
pub async fn execute_named<F, Fut, T, E>(
    policy_name: &str,
    operation: F,
) -> Result<T, RegistryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    builder_for_policy::<F, E>(policy_name, operation)?
        .call()
        .await
        .map_err(RegistryError::Operation)
}
