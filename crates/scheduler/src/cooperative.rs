//! Single cooperative-loop scheduler.
//!
//! One driver task owns every registered job and fires them from a
//! single loop in submission order, so clients need no internal locking:
//! there is never concurrent access from this scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::warn;

use crate::adapter::{HandleInner, OnceTask, PeriodicTask, Scheduler, SchedulerError, TaskHandle};

pub(crate) enum DriverCommand {
    Periodic {
        id: u64,
        period: Duration,
        task: PeriodicTask,
    },
    Once {
        due: Instant,
        task: OnceTask,
    },
    Cancel {
        id: u64,
        ack: oneshot::Sender<()>,
    },
}

struct PeriodicJob {
    id: u64,
    period: Duration,
    next_due: Instant,
    task: PeriodicTask,
}

struct OnceJob {
    due: Instant,
    task: OnceTask,
}

/// Scheduler that runs every job on one shared driver task.
pub struct CooperativeScheduler {
    commands: mpsc::UnboundedSender<DriverCommand>,
    next_id: AtomicU64,
}

impl Default for CooperativeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CooperativeScheduler {
    /// Spawn the driver loop on the current runtime. Without a runtime
    /// the scheduler is constructed inert: every scheduling invocation
    /// fails with `RuntimeUnavailable` instead of panicking.
    pub fn new() -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(drive(rx));
            }
            Err(_) => {
                warn!("no runtime reachable; cooperative scheduling will be inert");
            }
        }
        Self {
            commands,
            next_id: AtomicU64::new(1),
        }
    }

    fn send(&self, cmd: DriverCommand) -> Result<(), SchedulerError> {
        self.commands.send(cmd).map_err(|_| {
            SchedulerError::RuntimeUnavailable("cooperative driver is gone".to_string())
        })
    }
}

impl Scheduler for CooperativeScheduler {
    fn schedule_periodic(
        &self,
        period: Duration,
        task: PeriodicTask,
    ) -> Result<TaskHandle, SchedulerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(DriverCommand::Periodic { id, period, task })?;
        Ok(TaskHandle(HandleInner::Cooperative {
            id,
            commands: self.commands.clone(),
        }))
    }

    fn schedule_once(&self, delay: Duration, task: OnceTask) -> Result<(), SchedulerError> {
        self.send(DriverCommand::Once {
            due: Instant::now() + delay,
            task,
        })
    }
}

/// The driver loop. Exits when the scheduler (the command sender) drops.
async fn drive(mut rx: mpsc::UnboundedReceiver<DriverCommand>) {
    let mut periodic: Vec<PeriodicJob> = Vec::new();
    let mut one_shots: Vec<OnceJob> = Vec::new();

    loop {
        let next_due = periodic
            .iter()
            .map(|j| j.next_due)
            .chain(one_shots.iter().map(|j| j.due))
            .min();

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => apply(cmd, &mut periodic, &mut one_shots),
                None => break,
            },
            _ = wait_until(next_due) => {
                run_due(&mut periodic, &mut one_shots).await;
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

fn apply(cmd: DriverCommand, periodic: &mut Vec<PeriodicJob>, one_shots: &mut Vec<OnceJob>) {
    match cmd {
        DriverCommand::Periodic { id, period, task } => {
            periodic.push(PeriodicJob {
                id,
                period,
                next_due: Instant::now() + period,
                task,
            });
        }
        DriverCommand::Once { due, task } => {
            one_shots.push(OnceJob { due, task });
        }
        DriverCommand::Cancel { id, ack } => {
            // Commands are handled between firings, so the ack also
            // means no firing of this job is in flight.
            periodic.retain(|j| j.id != id);
            let _ = ack.send(());
        }
    }
}

async fn run_due(periodic: &mut [PeriodicJob], one_shots: &mut Vec<OnceJob>) {
    let now = Instant::now();

    for job in periodic.iter_mut() {
        if job.next_due <= now {
            (job.task)().await;
            // One firing per wake-up, however late; missed periods are
            // dropped so elapsed time can never fast-forward.
            job.next_due += job.period;
            let after = Instant::now();
            while job.next_due <= after {
                job.next_due += job.period;
            }
        }
    }

    let mut i = 0;
    while i < one_shots.len() {
        if one_shots[i].due <= now {
            let job = one_shots.remove(i);
            (job.task)().await;
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    fn counting_task(counter: Arc<AtomicUsize>) -> PeriodicTask {
        Box::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_fires_once_per_period() {
        let scheduler = CooperativeScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .schedule_periodic(Duration::from_millis(10), counting_task(counter.clone()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_fire_in_submission_order() {
        let scheduler = CooperativeScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let record = |tag: u8| -> PeriodicTask {
            let order = order.clone();
            Box::new(move || {
                let order = order.clone();
                Box::pin(async move {
                    order.lock().unwrap().push(tag);
                })
            })
        };

        let a = scheduler
            .schedule_periodic(Duration::from_millis(10), record(1))
            .unwrap();
        let b = scheduler
            .schedule_periodic(Duration::from_millis(10), record(2))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 1, 2]);

        a.cancel().await;
        b.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_awaits_and_stops_the_job() {
        let scheduler = CooperativeScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = scheduler
            .schedule_periodic(Duration::from_millis(10), counting_task(counter.clone()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(15)).await;
        handle.cancel().await;
        let fired = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), fired);
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_after_delay() {
        let scheduler = CooperativeScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let task: OnceTask = {
            let counter = counter.clone();
            Box::new(move || {
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
        };
        scheduler
            .schedule_once(Duration::from_millis(20), task)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn without_a_runtime_construction_is_inert_not_fatal() {
        let scheduler = CooperativeScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let err = scheduler
            .schedule_periodic(Duration::from_millis(10), counting_task(counter.clone()))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::RuntimeUnavailable(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_firings_are_not_summed() {
        let scheduler = CooperativeScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let slow: PeriodicTask = {
            let counter = counter.clone();
            Box::new(move || {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(25)).await;
                })
            })
        };

        let handle = scheduler
            .schedule_periodic(Duration::from_millis(10), slow)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let fired = counter.load(Ordering::SeqCst);
        assert!(fired >= 2, "expected at least two firings, got {}", fired);
        assert!(fired <= 4, "missed ticks were summed: {} firings", fired);

        handle.cancel().await;
    }
}
