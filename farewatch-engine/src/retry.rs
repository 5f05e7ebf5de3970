use std::future::Future;
use std::time::Duration;

use farewatch_core::ports::BoxError;
use tracing::warn;

/// Retry policy for one durable step. Attempts are spaced by
/// `initial_delay * backoff_multiplier^(attempt-1)`; the whole step is bounded
/// by `overall_timeout`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: u32,
    pub overall_timeout: Duration,
}

/// Per-user processing: 5 attempts, exponential backoff from one minute,
/// 10 minutes overall.
pub const PROCESSING_RETRY: RetryPolicy = RetryPolicy {
    max_attempts: 5,
    initial_delay: Duration::from_secs(60),
    backoff_multiplier: 2,
    overall_timeout: Duration::from_secs(600),
};

/// Per-page award fetch: 3 attempts, fixed 30 second delay, 10 minutes
/// overall.
pub const PAGE_RETRY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    initial_delay: Duration::from_secs(30),
    backoff_multiplier: 1,
    overall_timeout: Duration::from_secs(600),
};

#[derive(Debug, thiserror::Error)]
#[error("{what} timed out after {timeout:?}")]
pub struct RetryTimeout {
    pub what: String,
    pub timeout: Duration,
}

/// Runs `op` under `policy`. Exceeding the overall timeout counts as a
/// failure, not a separate cancellation path.
pub async fn retry_with<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, BoxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    let attempts = async {
        let mut delay = policy.initial_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < policy.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        "{what} failed, retrying in {delay:?}: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= policy.backoff_multiplier;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    };

    match tokio::time::timeout(policy.overall_timeout, attempts).await {
        Ok(result) => result,
        Err(_) => Err(Box::new(RetryTimeout {
            what: what.to_string(),
            timeout: policy.overall_timeout,
        })),
    }
}
