//! Fire-and-forget remote dispatch.
//!
//! Every remote call is spawned as its own task on the engine's runtime.
//! Outcomes go to the log and nowhere else. `InFlight` counts launched
//! work so a caller about to exit can wait for it.

use crate::model::task::TaskId;
use crate::remote::{RemoteResult, RemoteStore};
use log::{debug, warn};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// Number of launched dispatches that have not finished yet.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolves once no dispatch is pending.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

// Released on completion and on cancellation alike.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteOp {
    Create,
    Upsert,
    Delete,
}

impl Display for RemoteOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        })
    }
}

/// Launches one remote call without waiting for it.
pub(crate) fn spawn_remote<F>(
    runtime: &Handle,
    in_flight: &Arc<InFlight>,
    op: RemoteOp,
    task_id: TaskId,
    call: F,
) where
    F: Future<Output = RemoteResult<()>> + Send + 'static,
{
    let guard = in_flight.begin();
    runtime.spawn(async move {
        let _guard = guard;
        match call.await {
            Ok(()) => debug!(
                "event=remote_dispatch module=sync status=ok op={} task_id={}",
                op, task_id
            ),
            Err(err) => warn!(
                "event=remote_dispatch module=sync status=error op={} task_id={} error={}",
                op, task_id, err
            ),
        }
    });
}

/// Launches one delete per id and returns once all of them are spawned.
///
/// Failures are reported as one aggregate log line, not per id.
pub(crate) fn spawn_bulk_delete(
    runtime: &Handle,
    in_flight: &Arc<InFlight>,
    remote: Arc<RemoteStore>,
    task_ids: Vec<TaskId>,
) {
    let mut pending = JoinSet::new();
    for task_id in task_ids {
        let remote = remote.clone();
        pending.spawn_on(async move { remote.delete(task_id).await }, runtime);
    }

    let guard = in_flight.begin();
    runtime.spawn(async move {
        let _guard = guard;
        let total = pending.len();
        let mut failed = 0usize;
        let mut last_error = None;
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failed += 1;
                    last_error = Some(err.to_string());
                }
                Err(err) => {
                    failed += 1;
                    last_error = Some(err.to_string());
                }
            }
        }

        match last_error {
            None => debug!(
                "event=remote_dispatch module=sync status=ok op=delete_completed total={}",
                total
            ),
            Some(err) => warn!(
                "event=remote_dispatch module=sync status=error op=delete_completed total={} failed={} error={}",
                total, failed, err
            ),
        }
    });
}
