//! Parallel per-region scheduler.
//!
//! Every scheduled job runs on its own runtime task, so periodic jobs
//! from different call sites execute concurrently. Serialization of any
//! shared state is the caller's concern (the coordinator guards its
//! trackers and clock with one mutex).

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::warn;

use crate::adapter::{HandleInner, OnceTask, PeriodicTask, Scheduler, SchedulerError, TaskHandle};

/// Scheduler backed by the host's parallel region runtime.
pub struct RegionScheduler {
    handle: Option<Handle>,
}

impl RegionScheduler {
    /// Bind to the current runtime. If no runtime is actually reachable
    /// despite the capability probe (mis-detection), every scheduling
    /// invocation will fail with `RuntimeUnavailable` instead of
    /// panicking; callers log it and the affected job stays inert.
    pub fn current() -> Self {
        let handle = Handle::try_current().ok();
        if handle.is_none() {
            warn!("parallel regions detected but no runtime reachable; scheduling will be inert");
        }
        Self { handle }
    }

    fn handle(&self) -> Result<&Handle, SchedulerError> {
        self.handle.as_ref().ok_or_else(|| {
            SchedulerError::RuntimeUnavailable("no region runtime bound".to_string())
        })
    }
}

impl Scheduler for RegionScheduler {
    fn schedule_periodic(
        &self,
        period: Duration,
        mut task: PeriodicTask,
    ) -> Result<TaskHandle, SchedulerError> {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let join = self.handle()?.spawn(async move {
            // First firing one full period from now; late ticks are
            // skipped rather than summed so a stalled region can never
            // fast-forward the session clock.
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        // Runs in the branch body: a shutdown signal
                        // arriving mid-firing waits for it to finish.
                        task().await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Ok(TaskHandle(HandleInner::Region { shutdown, join }))
    }

    fn schedule_once(&self, delay: Duration, task: OnceTask) -> Result<(), SchedulerError> {
        self.handle()?.spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;
        });
        Ok(())
    }
}
