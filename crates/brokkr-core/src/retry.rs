//! Retry with configurable backoff for network operations

use crate::types::{RetryPolicy, RetryStrategy};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Calculate the delay before the next retry attempt
///
/// # Arguments
///
/// * `policy` - The retry policy containing strategy and timing parameters
/// * `attempt` - The current attempt number (1-indexed)
/// * `jitter` - Whether to apply random jitter to the delay
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, jitter: bool) -> Duration {
    // Attempt is 1-indexed, but we want 0-indexed for calculations
    let attempt_index = attempt.saturating_sub(1);

    let base_delay_ms = match policy.strategy {
        RetryStrategy::None => 0,

        RetryStrategy::FixedDelay => policy.initial_delay_ms,

        RetryStrategy::ExponentialBackoff => {
            let multiplier = policy.backoff_multiplier.powf(attempt_index as f64);
            (policy.initial_delay_ms as f64 * multiplier) as u64
        }
    };

    // Apply max delay cap
    let capped_delay_ms = base_delay_ms.min(policy.max_delay_ms);

    // Apply jitter if requested (adds up to 25% random variation)
    let final_delay_ms = if jitter && capped_delay_ms > 0 {
        let jitter_range = capped_delay_ms / 4;
        let jitter_value = rand::rng().random_range(0..=jitter_range);
        capped_delay_ms + jitter_value
    } else {
        capped_delay_ms
    };

    Duration::from_millis(final_delay_ms)
}

/// Execute an async operation with retry logic based on a policy.
///
/// Runs `op` until it succeeds, `should_retry` rejects the error, or the
/// policy's attempts are exhausted. The last error is returned unchanged.
///
/// # Arguments
///
/// * `policy` - The retry policy to use
/// * `operation` - Name used in retry log lines
/// * `should_retry` - Predicate deciding whether an error is transient
/// * `op` - A closure that returns a future representing the operation
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    mut should_retry: impl FnMut(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !should_retry(&err) {
                    return Err(err);
                }

                let delay = calculate_delay(policy, attempt, true);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation, attempt, max_attempts, delay, err
                );

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                attempt += 1;
            }
        }
    }
}
