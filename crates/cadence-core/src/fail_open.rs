//! Fail-open helpers for soft persistence
//!
//! Durable-store writes, tracker updates and telemetry publishes are
//! best-effort: the in-memory workflow state stays authoritative for the
//! lifetime of the process, so these failures are logged and swallowed.
//!
//! DO NOT use fail-open for:
//! - Pause signals
//! - Precondition checks (missing planning artifact, missing conversation)
//! - Aggregated skill errors

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run an async operation that must never fail the caller
///
/// Logs the error via `tracing::warn!` and returns `None` on failure.
///
/// ```no_run
/// use cadence_core::fail_open::fail_open;
/// use cadence_core::Result;
///
/// async fn persist() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("session_store::update", || persist()).await;
///     assert!(saved.is_some());
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    soft(operation_name, f().await)
}

/// Synchronous counterpart of [`fail_open`] for an already computed result
pub fn soft<T>(operation_name: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(val) => Some(val),
        Err(e) => {
            warn!(operation = operation_name, error = %e, "{} failed (fail-open)", operation_name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CadenceError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, CadenceError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(CadenceError::Store("disk full".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[test]
    fn test_soft_passes_value_through() {
        assert_eq!(soft("op", Ok::<_, CadenceError>("x")), Some("x"));
        assert_eq!(soft::<()>("op", Err(CadenceError::Telemetry("down".into()))), None);
    }
}
