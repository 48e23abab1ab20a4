//! Storage error type shared by every repository trait, and the deadline
//! wrappers applied to repository calls.
//!
//! Stores enforce `storage.operation_timeout_ms` themselves (PostgreSQL runs
//! with a matching `statement_timeout`), so a write that exceeds it is
//! aborted and rolled back before `Timeout` is reported. The client-side
//! wrappers here are outer guards for a store that stops answering.

use std::future::Future;
use std::time::Duration;

/// Failure reported by a repository implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write. Carries the constraint
    /// or key name.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The backing store could not be reached or rejected the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The store aborted the operation at its deadline. Nothing was written.
    #[error("Storage operation timed out")]
    Timeout,

    /// A write was abandoned without an answer from the store. It may or
    /// may not have been applied.
    #[error("Storage write outcome unknown")]
    OutcomeUnknown,

    /// A stored record could not be mapped back into the domain.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl RepositoryError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Run a read under `deadline`.
///
/// Expiry drops the in-flight future and reports [`RepositoryError::Timeout`].
pub async fn within_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Repository call timed out");
            Err(RepositoryError::Timeout)
        }
    }
}

/// Outer guard for a write whose store enforces `deadline` itself.
pub fn write_guard(deadline: Duration) -> Duration {
    deadline * 2
}

/// Run a write under the outer guard for `deadline`.
///
/// The store answers `Timeout` on its own once `deadline` passes. If the
/// guard fires first, the write may already be applied, so expiry reports
/// [`RepositoryError::OutcomeUnknown`] rather than a retryable error.
pub async fn within_write_deadline<T, F>(
    deadline: Duration,
    operation: F,
) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    let guard = write_guard(deadline);
    match tokio::time::timeout(guard, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(guard_ms = guard.as_millis() as u64, "Store did not answer a write");
            Err(RepositoryError::OutcomeUnknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: Result<(), _> = within_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(RepositoryError::Timeout));
        assert!(RepositoryError::Timeout.is_transient());
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = within_deadline(Duration::from_secs(1), async { Ok::<_, RepositoryError>(7) }).await;
        assert_eq!(result, Ok(7));
        assert!(!RepositoryError::DuplicateKey("k".into()).is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn store_side_timeout_passes_through_write_guard() {
        let result: Result<(), _> = within_write_deadline(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(RepositoryError::Timeout)
        })
        .await;

        assert_eq!(result, Err(RepositoryError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_write_is_not_retryable() {
        let started = tokio::time::Instant::now();
        let result: Result<(), _> = within_write_deadline(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(RepositoryError::OutcomeUnknown));
        assert!(!RepositoryError::OutcomeUnknown.is_transient());
        assert_eq!(started.elapsed(), write_guard(Duration::from_millis(100)));
    }
}
