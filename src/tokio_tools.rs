use std::future::Future;
use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a Tokio task with a stable name when supported, and trace span otherwise.
/// Only the named builder can fail.
pub fn spawn_named_task<F, S>(name: S, future: F) -> io::Result<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    let name_owned = name.into();
    #[cfg(tokio_unstable)]
    {
        tokio::task::Builder::new().name(&name_owned).spawn(future)
    }
    #[cfg(not(tokio_unstable))]
    {
        use tracing::Instrument;
        let span = tracing::info_span!("task", task_name = %name_owned);
        Ok(tokio::spawn(future.instrument(span)))
    }
}

/// Like [`spawn_named_task`], but the future is dropped as soon as `stop` is
/// cancelled. Resolves to `None` in that case.
pub fn spawn_cancellable<F, S>(
    name: S,
    stop: CancellationToken,
    future: F,
) -> io::Result<JoinHandle<Option<F::Output>>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    spawn_named_task(name, async move {
        tokio::select! {
            _ = stop.cancelled() => None,
            output = future => Some(output),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_the_future() {
        let stop = CancellationToken::new();
        let task = spawn_cancellable("sleeper", stop.clone(), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            7
        })
        .unwrap();
        stop.cancel();
        assert_eq!(task.await.unwrap(), None);

        let done = spawn_cancellable("quick", CancellationToken::new(), async { 7 }).unwrap();
        assert_eq!(done.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn named_tasks_hand_back_their_join_handle() {
        let task = spawn_named_task("answer", async { 42 }).expect("task spawned");
        assert_eq!(task.await.unwrap(), 42);
    }
}
