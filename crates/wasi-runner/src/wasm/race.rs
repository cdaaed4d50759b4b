//! Race between blocking work and a cancellation token.

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Which side of the race settled first.
#[derive(Debug)]
pub(crate) enum RaceResult<T> {
    /// The work returned a value
    Finished(T),
    /// The work panicked on its worker thread
    Panicked(JoinError),
    /// The token fired first; the work is detached and keeps running
    Cancelled,
}

/// Run `work` on the blocking pool and wait for it or for `cancel`.
///
/// A token that is already cancelled wins without starting the work, which is
/// dropped in place. When the token fires mid-run the worker is detached and
/// whatever `work` owns is released when it returns.
pub(crate) async fn race_blocking<T, F>(work: F, cancel: &CancellationToken) -> RaceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    if cancel.is_cancelled() {
        return RaceResult::Cancelled;
    }

    let handle = tokio::task::spawn_blocking(work);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => RaceResult::Cancelled,
        joined = handle => match joined {
            Ok(value) => RaceResult::Finished(value),
            Err(e) => RaceResult::Panicked(e),
        },
    }
}
