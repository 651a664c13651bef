//! Bounded exponential backoff for transient storage contention.

use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RetryConfig;

/// Retry policy applied to every store round-trip.
///
/// Only errors reporting [`DomainError::is_transient`] are retried. Once
/// `max_attempts` is exhausted the last transient error is surfaced as
/// [`DomainError::StorageUnavailable`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff_ms, config.max_backoff_ms)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        let initial_backoff = Duration::from_millis(initial_backoff_ms.max(1));
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: Duration::from_millis(max_backoff_ms).max(initial_backoff),
        }
    }

    /// Policy that never waits, for tests that provoke contention on purpose.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 1, 1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let max_attempts = self.max_attempts;
        let mut attempts = 0u32;

        let result = backoff::future::retry(backoff, || {
            attempts += 1;
            let attempt = attempts;
            let fut = operation();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_transient() && attempt < max_attempts => {
                        debug!(attempt, error = %err, "transient storage error, retrying");
                        Err(backoff::Error::transient(err))
                    }
                    Err(err) => Err(backoff::Error::permanent(err)),
                }
            }
        })
        .await;

        result.map_err(|err| {
            if err.is_transient() {
                warn!(attempts, error = %err, "storage retries exhausted");
                DomainError::StorageUnavailable {
                    attempts,
                    reason: err.to_string(),
                }
            } else {
                err
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let value = policy
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DomainError::StorageBusy("locked".into()))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_storage_unavailable() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let err = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DomainError::StorageBusy("locked".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::StorageUnavailable { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let err = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DomainError::not_found("molecule", "m1"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
