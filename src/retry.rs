//! The retry harness (C8): exponential backoff with jitter around any
//! fallible async operation, classifying retryability through
//! `BridgeError::retryable()` rather than matching on error text.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use crate::error::BridgeError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

/// `spec.md` §4.8's literal defaults: `maxRetries=3, initial=1000ms,
/// max=30000ms, multiplier=2`. Jitter is delegated to
/// `backoff::ExponentialBackoff`'s own `randomization_factor` (see
/// `to_backoff`) rather than the spec's `random(0..100ms)` additive term —
/// see `DESIGN.md` for the grounded reason.
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            multiplier: self.multiplier,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

/// Run `op`, retrying on failures that `is_retryable` accepts, up to
/// `cfg.max_retries` attempts, sleeping an exponentially growing,
/// jittered interval between attempts. The first failing attempt counts
/// against the budget; a non-retryable error returns immediately.
pub async fn with_retry<F, Fut, T>(
    cfg: &RetryConfig,
    is_retryable: impl Fn(&BridgeError) -> bool,
    mut op: F,
) -> Result<T, BridgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BridgeError>>,
{
    let mut backoff = cfg.to_backoff();
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > cfg.max_retries || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = backoff.next_backoff().unwrap_or(cfg.max_delay);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 1.0,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_works() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&immediate_config(), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BridgeError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_budget_exhausted_then_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), BridgeError> = with_retry(&immediate_config(), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::Engine("still failing".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4); // 1 initial + 3 retries
    }

    #[tokio::test]
    async fn non_retryable_error_returns_on_first_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<(), BridgeError> = with_retry(&immediate_config(), |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::Engine("fatal".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// `spec.md` §9's literal example: `{initial=1000, multiplier=2,
    /// jitter=0, max=30000}` must produce `[1000, 2000, 4000, 8000]`.
    #[test]
    fn backoff_sequence_matches_the_literal_spec_example() {
        let cfg = RetryConfig {
            max_retries: 4,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
        };
        let mut backoff = cfg.to_backoff();
        backoff.randomization_factor = 0.0;
        let delays: Vec<u64> = (0..4)
            .map(|_| backoff.next_backoff().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
    }
}
