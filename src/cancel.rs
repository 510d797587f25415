//! Deterministic termination for in-flight provider round-trips.
//!
//! Every interactive operation is raced against the session's
//! cancellation token and a timeout. Exactly one branch wins; the losing
//! futures are dropped on the spot, which stops provider poll loops and
//! releases the timer, so a settled operation can never resolve a second
//! time.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a raced operation ended.
#[derive(Debug)]
pub enum RaceOutcome<T> {
    Completed(T),
    Canceled,
    TimedOut,
}

/// Drive `operation` until it settles, the session cancels, or `timeout`
/// elapses, whichever happens first.
pub async fn race<F, T>(
    operation: F,
    cancel: &CancellationToken,
    timeout: Duration,
) -> RaceOutcome<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        result = operation => RaceOutcome::Completed(result),
        _ = cancel.cancelled() => RaceOutcome::Canceled,
        _ = tokio::time::sleep(timeout) => RaceOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future;

    #[tokio::test]
    async fn completed_operation_wins() {
        let token = CancellationToken::new();
        let outcome = race(async { 7 }, &token, Duration::from_secs(1)).await;
        assert!(matches!(outcome, RaceOutcome::Completed(7)));
    }

    #[tokio::test]
    async fn canceled_token_beats_pending_operation() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = race(future::pending::<()>(), &token, Duration::from_secs(1)).await;
        assert!(matches!(outcome, RaceOutcome::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_at_the_configured_window() {
        let token = CancellationToken::new();
        let started = tokio::time::Instant::now();
        let outcome = race(
            future::pending::<()>(),
            &token,
            Duration::from_millis(300_000),
        )
        .await;
        assert!(matches!(outcome, RaceOutcome::TimedOut));
        assert_eq!(started.elapsed(), Duration::from_millis(300_000));
    }
}
