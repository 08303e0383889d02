use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::table_actor::TableCommand;
use crate::engine::tw::TimerRequest;
use crate::tokio_tools::spawn_cancellable;

const LOG_TARGET: &str = "tw_mahjong::coordinator::scheduler";

/// A pending firing. Dropping the handle cancels it.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: CancellationToken,
}

impl TimerHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Turns a timer request into a `TableCommand::Timeout` after `after`, unless
/// the returned handle is cancelled first.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, after: Duration, timer: TimerRequest) -> TimerHandle;
}

/// Sleeps on the tokio timer wheel and posts into the table's own mailbox.
/// Holds only a weak sender so pending timers never keep a table alive.
pub struct TokioScheduler {
    mailbox: mpsc::WeakSender<TableCommand>,
}

impl TokioScheduler {
    pub fn new(mailbox: mpsc::WeakSender<TableCommand>) -> Self {
        Self { mailbox }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, after: Duration, timer: TimerRequest) -> TimerHandle {
        let cancel = CancellationToken::new();
        let mailbox = self.mailbox.clone();
        let name = format!("timer-{:?}-{}", timer.kind, timer.token);
        let spawned = spawn_cancellable(name, cancel.clone(), async move {
            tokio::time::sleep(after).await;
            let Some(tx) = mailbox.upgrade() else {
                return;
            };
            trace!(target: LOG_TARGET, kind = ?timer.kind, token = timer.token, "timer fired");
            let _ = tx.send(TableCommand::Timeout(timer)).await;
        });
        if let Err(err) = spawned {
            // The returned handle reports cancelled so the next reconcile retries.
            warn!(
                target: LOG_TARGET,
                kind = ?timer.kind,
                token = timer.token,
                error = %err,
                "failed to spawn timer task"
            );
            cancel.cancel();
        }
        TimerHandle::new(cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tw::TimerKind;

    fn turn(token: u64) -> TimerRequest {
        TimerRequest {
            kind: TimerKind::Turn,
            token,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_into_the_mailbox_after_the_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let scheduler = TokioScheduler::new(tx.downgrade());
        let _handle = scheduler.schedule(Duration::from_secs(30), turn(3));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::sleep(Duration::from_secs(2)).await;
        match rx.recv().await {
            Some(TableCommand::Timeout(timer)) => assert_eq!(timer, turn(3)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handles_never_fire() {
        let (tx, mut rx) = mpsc::channel(4);
        let scheduler = TokioScheduler::new(tx.downgrade());
        let handle = scheduler.schedule(Duration::from_secs(1), turn(1));
        assert!(!handle.is_cancelled());
        drop(handle);
        let kept = scheduler.schedule(Duration::from_secs(2), turn(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        match rx.recv().await {
            Some(TableCommand::Timeout(timer)) => assert_eq!(timer, turn(2)),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        drop(kept);
    }
}
