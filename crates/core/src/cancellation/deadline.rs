//! Bounded waits that treat a timeout as a normal outcome.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Outcome of [`cancel_after`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deadline<T> {
    /// The future finished before the timeout.
    Completed(T),
    /// The timeout elapsed first. Not an error: callers continue without the value.
    Elapsed,
    /// The governing token was cancelled. Callers abort their downstream work.
    Cancelled,
}

impl<T> Deadline<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Deadline::Cancelled)
    }
}

/// Run `future` for at most `timeout`.
///
/// Cancellation through `token` takes precedence over both completion and the timeout.
pub async fn cancel_after<F>(
    future: F,
    timeout: Duration,
    token: Option<&CancellationToken>,
) -> Deadline<F::Output>
where
    F: Future,
{
    let cancelled = async {
        match token {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Deadline::Cancelled,
        output = future => Deadline::Completed(output),
        _ = tokio::time::sleep(timeout) => Deadline::Elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_timeout() {
        let result = cancel_after(async { 42 }, Duration::from_millis(2200), None).await;
        assert_eq!(result, Deadline::Completed(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_is_not_an_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "late"
        };
        let result = cancel_after(slow, Duration::from_millis(2200), None).await;
        assert_eq!(result, Deadline::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();

        let result = cancel_after(async { 1 }, Duration::from_millis(2200), Some(&token)).await;
        assert!(result.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_wait() {
        let token = CancellationToken::new();
        let trigger = token.clone();

        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        };
        let (result, _) = tokio::join!(cancel_after(slow, Duration::from_secs(5), Some(&token)), async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        assert_eq!(result, Deadline::Cancelled);
    }
}
