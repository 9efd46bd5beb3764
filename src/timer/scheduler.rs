//! Clock and deferred-task seam used by the countdown

use std::{fmt::Debug, ops::Sub, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

use crate::error::{Result, TimerError};

/// Boxed task handed to a scheduler
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A pending task that can be withdrawn
pub trait ScheduledTask: Send + 'static {
    /// Prevent the task from running if it has not started yet
    fn cancel(&self);
}

/// Monotonic clock plus "run this after a delay"
pub trait Scheduler: Send + Sync + 'static {
    type Instant: Copy
        + Debug
        + Ord
        + Send
        + Sync
        + Sub<Self::Instant, Output = Duration>;

    type Handle: ScheduledTask;

    /// Current monotonic instant
    fn now(&self) -> Self::Instant;

    /// Run `task` once `delay` has elapsed. Delays too large for the clock
    /// must saturate rather than panic.
    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle;
}

/// Roughly 30 years, the same horizon tokio uses for "never"
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, clamped to a far-future instant instead of overflowing
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Scheduler backed by the tokio timer
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime of the calling context
    pub fn new() -> Result<Self> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|e| TimerError::NoRuntime { reason: e.to_string() })
    }

    /// Bind to an explicit runtime
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

/// Pending tokio task
#[derive(Debug)]
pub struct TokioTask(JoinHandle<()>);

impl ScheduledTask for TokioTask {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    type Instant = Instant;
    type Handle = TokioTask;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TokioTask {
        // Fix the deadline now, not on the spawned task's first poll
        let due = deadline_after(Instant::now(), delay);
        TokioTask(self.handle.spawn(async move {
            tokio::time::sleep_until(due).await;
            task();
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn deadline_saturates_instead_of_overflowing() {
        let now = Instant::now();

        assert_eq!(deadline_after(now, Duration::from_millis(5)), now + Duration::from_millis(5));
        assert!(deadline_after(now, Duration::MAX) > now);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_delay_is_scheduled_and_cancelled() -> anyhow::Result<()> {
        let scheduler = TokioScheduler::new()?;
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_task = Arc::clone(&ran);

        let task = scheduler.schedule(
            Duration::MAX,
            Box::new(move || ran_in_task.store(true, Ordering::SeqCst)),
        );
        tokio::time::sleep(Duration::from_secs(3600)).await;
        task.cancel();

        assert!(!ran.load(Ordering::SeqCst));
        Ok(())
    }
}
