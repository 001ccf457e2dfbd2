//! Provider call example
//!
//! Wraps the kinds of calls a web backend makes to third-party services
//! (text generation, embeddings, voice-call listing, webhook delivery) in the
//! retry executor. The providers are simulated so the example runs offline.
//!
//! Run with: RUST_LOG=debug cargo run --example provider_calls

use backoff_executor::{
    CancellationToken, Classification, RetryConfig, RetryError, RetryPolicy, Retryable,
    clear_global_policies, execute, execute_named,
};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ProviderError {
    Timeout,
    RateLimited,
    Unauthorized,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Timeout => write!(f, "provider timed out"),
            ProviderError::RateLimited => write!(f, "provider rate limited the request"),
            ProviderError::Unauthorized => write!(f, "provider rejected the API key"),
        }
    }
}

impl std::error::Error for ProviderError {}

fn classify(error: &ProviderError) -> Classification {
    match error {
        ProviderError::Timeout | ProviderError::RateLimited => Classification::Retryable,
        ProviderError::Unauthorized => Classification::Fatal,
    }
}

const CONFIG: &str = r#"
[default]
max_attempts = 3
initial_delay_ms = 50

[policies.voice-calls]
max_attempts = 4
initial_delay_ms = 20
jitter = 0.25
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RetryConfig::from_toml_str(CONFIG)?;
    config.install_global()?;

    // 1. Text generation: times out twice, then answers.
    let attempts = AtomicU32::new(0);
    let completion = execute(
        || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tracing::info!(attempt = n, "requesting completion");
                if n < 3 {
                    Err(ProviderError::Timeout)
                } else {
                    Ok(String::from("Hello from the model"))
                }
            }
        },
        &config.default_policy()?,
    )
    .await?;
    tracing::info!(%completion, "text generation finished");

    // 2. Embedding: the key is rejected, which is never worth retrying.
    let attempts = AtomicU32::new(0);
    let embedding: Result<Vec<f32>, ProviderError> = (|| {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(ProviderError::Unauthorized) }
    })
    .retry(RetryPolicy::new(5, Duration::from_millis(50), 2.0)?)
    .classify(classify)
    .call()
    .await;
    tracing::info!(
        attempts = attempts.load(Ordering::SeqCst),
        error = ?embedding.err(),
        "embedding gave up without retrying"
    );

    // 3. Voice-call listing under the named policy from the config.
    let attempts = AtomicU32::new(0);
    let calls = execute_named("voice-calls", || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                Err(ProviderError::RateLimited)
            } else {
                Ok(vec!["CA-1001", "CA-1002"])
            }
        }
    })
    .await?;
    tracing::info!(count = calls.len(), "voice calls listed");

    // 4. Webhook delivery, abandoned when the request is shut down.
    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.cancel();
    });

    let deliver = || async { Err(ProviderError::Timeout) };
    let delivery: Result<(), RetryError<ProviderError>> = deliver
        .retry(RetryPolicy::new(10, Duration::from_millis(100), 2.0)?)
        .call_cancellable(&token)
        .await;
    match delivery {
        Err(RetryError::Cancelled { attempts }) => {
            tracing::info!(attempts, "webhook delivery cancelled")
        }
        other => tracing::warn!(?other, "webhook delivery ended unexpectedly"),
    }

    clear_global_policies();
    Ok(())
}
