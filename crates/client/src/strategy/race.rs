//! Network-versus-timer race.

use std::future::Future;
use std::time::Duration;

/// Outcome of racing a future against a timer.
#[derive(Debug, PartialEq, Eq)]
pub enum Race<T> {
    /// The future finished first.
    Settled(T),
    /// The timer fired first; the future was dropped unfinished.
    TimedOut,
}

/// Run `fut` until it completes or `timeout` elapses.
///
/// The timer is polled first, so a future that would complete on the same tick
/// as the deadline loses. The losing future is dropped, which means a late
/// network response can never reach the cache.
pub async fn race<F, T>(fut: F, timeout: Duration) -> Race<T>
where
    F: Future<Output = T>,
{
    let timer = tokio::time::sleep(timeout);
    tokio::pin!(timer);
    tokio::pin!(fut);

    tokio::select! {
        biased;
        _ = &mut timer => Race::TimedOut,
        value = &mut fut => Race::Settled(value),
    }
}
