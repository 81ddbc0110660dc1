//! Scheduler trait, capability probe and task handles.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cooperative::DriverCommand;

/// Boxed future produced by one firing of a scheduled task.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A recurring task; called once per period to produce that firing's work.
pub type PeriodicTask = Box<dyn FnMut() -> TaskFuture + Send>;

/// A deferred one-shot task.
pub type OnceTask = Box<dyn FnOnce() -> TaskFuture + Send>;

/// Errors from scheduling invocations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The execution context needed to run tasks is gone.
    #[error("scheduler runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

/// Which concurrency model the host provides. Decided once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    /// One shared execution context; tasks run in submission order.
    Cooperative,
    /// Independent parallel execution regions; tasks run concurrently.
    Regional,
}

impl SchedulerKind {
    /// Probe the host's concurrency model. Result is cached for the
    /// process lifetime; there is no re-detection.
    pub fn detect() -> SchedulerKind {
        static DETECTED: OnceLock<SchedulerKind> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            let kind = probe();
            info!(kind = ?kind, "scheduler capability detected");
            kind
        })
    }
}

/// Uncached probe: a multi-threaded runtime offers parallel regions;
/// a current-thread runtime, or no runtime at all, degrades to the
/// cooperative loop. Never fatal.
pub(crate) fn probe() -> SchedulerKind {
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => SchedulerKind::Cooperative,
            _ => SchedulerKind::Regional,
        },
        Err(_) => SchedulerKind::Cooperative,
    }
}

/// Uniform scheduling contract over both concurrency models.
///
/// A periodic task fires at its nominal period with best-effort drift
/// correction: a late firing still counts as exactly one, and missed
/// periods are never summed into a burst. A one-shot fires at least
/// `delay` after scheduling, never before, and is not guaranteed to fire
/// if the host shuts down first.
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`. The returned handle cancels the task;
    /// cancellation is graceful and awaits any firing already in progress.
    fn schedule_periodic(
        &self,
        period: Duration,
        task: PeriodicTask,
    ) -> Result<TaskHandle, SchedulerError>;

    /// Run `task` once, `delay` from now.
    fn schedule_once(&self, delay: Duration, task: OnceTask) -> Result<(), SchedulerError>;
}

/// Build the scheduler matching the detected capability.
pub fn detect_scheduler() -> std::sync::Arc<dyn Scheduler> {
    match SchedulerKind::detect() {
        SchedulerKind::Regional => std::sync::Arc::new(crate::RegionScheduler::current()),
        SchedulerKind::Cooperative => std::sync::Arc::new(crate::CooperativeScheduler::new()),
    }
}

/// Handle to a scheduled periodic task.
pub struct TaskHandle(pub(crate) HandleInner);

pub(crate) enum HandleInner {
    Region {
        shutdown: watch::Sender<bool>,
        join: JoinHandle<()>,
    },
    Cooperative {
        id: u64,
        commands: mpsc::UnboundedSender<DriverCommand>,
    },
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            HandleInner::Region { .. } => f.debug_struct("TaskHandle::Region").finish_non_exhaustive(),
            HandleInner::Cooperative { id, .. } => f
                .debug_struct("TaskHandle::Cooperative")
                .field("id", id)
                .finish_non_exhaustive(),
        }
    }
}

impl TaskHandle {
    /// Unregister the task. Resolves only after any in-progress firing
    /// has finished, so a snapshot write mid-flight completes first.
    pub async fn cancel(self) {
        match self.0 {
            HandleInner::Region { shutdown, join } => {
                let _ = shutdown.send(true);
                let _ = join.await;
            }
            HandleInner::Cooperative { id, commands } => {
                let (ack, acked) = oneshot::channel();
                if commands.send(DriverCommand::Cancel { id, ack }).is_ok() {
                    let _ = acked.await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_sees_cooperative_on_current_thread() {
        assert_eq!(probe(), SchedulerKind::Cooperative);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn probe_sees_regions_on_multi_thread() {
        assert_eq!(probe(), SchedulerKind::Regional);
    }

    #[test]
    fn probe_degrades_without_a_runtime() {
        assert_eq!(probe(), SchedulerKind::Cooperative);
    }

    #[test]
    fn detect_scheduler_without_a_runtime_is_inert_not_fatal() {
        let scheduler = detect_scheduler();

        let task: OnceTask = Box::new(|| Box::pin(async {}));
        let err = scheduler
            .schedule_once(Duration::from_secs(1), task)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::RuntimeUnavailable(_)));
    }
}
