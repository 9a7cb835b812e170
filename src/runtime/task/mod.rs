use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::RuntimeError;

/// Races `task` against `token`. A cancelled token wins even if the task is
/// ready at the same poll, so callers never observe a result after teardown.
pub async fn run_cancellable<F, T>(token: &CancellationToken, task: F) -> Result<T, RuntimeError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(RuntimeError::Cancelled),
        output = task => Ok(output),
    }
}

/// Like [`run_cancellable`] for fallible tasks whose error type can express cancellation.
pub async fn run_cancellable_result<F, T, E>(token: &CancellationToken, task: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<RuntimeError>,
{
    run_cancellable(token, task).await?
}
