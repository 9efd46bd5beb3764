//! Virtual-time scheduler
//!
//! Time only moves when the owner calls [`ManualScheduler::advance`] or
//! [`ManualScheduler::elapse`], which makes countdown behaviour fully
//! reproducible.

use std::{
    collections::BTreeMap,
    ops::{Add, Sub},
    sync::{Arc, Weak},
    time::Duration,
};
use parking_lot::Mutex;
use tracing::trace;

use super::scheduler::{ScheduledTask, Scheduler, Task};

/// Instant on the virtual clock, measured from its creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ManualInstant(Duration);

impl ManualInstant {
    pub fn since_start(&self) -> Duration {
        self.0
    }
}

impl Add<Duration> for ManualInstant {
    type Output = ManualInstant;

    fn add(self, rhs: Duration) -> ManualInstant {
        ManualInstant(self.0.saturating_add(rhs))
    }
}

impl Sub for ManualInstant {
    type Output = Duration;

    fn sub(self, rhs: ManualInstant) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

type Key = (ManualInstant, u64);

#[derive(Default)]
struct Queue {
    now: ManualInstant,
    next_seq: u64,
    pending: BTreeMap<Key, Task>,
}

/// Scheduler whose clock is driven by hand
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<Queue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`, running every task that falls due in
    /// order of due time, then insertion order.
    pub fn advance(&self, by: Duration) {
        let target = self.queue.lock().now + by;
        loop {
            let task = {
                let mut queue = self.queue.lock();
                let due = match queue.pending.keys().next() {
                    Some(key) if key.0 <= target => *key,
                    _ => break,
                };
                if due.0 > queue.now {
                    queue.now = due.0;
                }
                queue.pending.remove(&due)
            };
            // Run outside the queue lock; the task may schedule more work
            if let Some(task) = task {
                task();
            }
        }
        let mut queue = self.queue.lock();
        if target > queue.now {
            queue.now = target;
        }
    }

    /// Move the clock forward without running anything
    pub fn elapse(&self, by: Duration) {
        let mut queue = self.queue.lock();
        queue.now = queue.now + by;
    }

    /// Number of tasks still waiting
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.queue.lock().now.since_start()
    }
}

/// Pending task on a [`ManualScheduler`]
pub struct ManualTask {
    key: Key,
    queue: Weak<Mutex<Queue>>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&self) {
        if let Some(queue) = self.queue.upgrade() {
            queue.lock().pending.remove(&self.key);
        }
    }
}

impl Scheduler for ManualScheduler {
    type Instant = ManualInstant;
    type Handle = ManualTask;

    fn now(&self) -> ManualInstant {
        self.queue.lock().now
    }

    fn schedule(&self, delay: Duration, task: Task) -> ManualTask {
        let mut queue = self.queue.lock();
        let key = (queue.now + delay, queue.next_seq);
        queue.next_seq += 1;
        queue.pending.insert(key, task);
        trace!(due_ms = key.0.since_start().as_millis() as u64, "task scheduled");
        ManualTask {
            key,
            queue: Arc::downgrade(&self.queue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_tasks = Arc::clone(&log);
        let make = move |name: &'static str| -> Task {
            let log = Arc::clone(&log_for_tasks);
            Box::new(move || log.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn runs_due_tasks_in_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.schedule(Duration::from_millis(20), task("late"));
        scheduler.schedule(Duration::from_millis(10), task("early"));
        scheduler.schedule(Duration::from_millis(10), task("early-second"));
        scheduler.schedule(Duration::from_millis(50), task("not-yet"));

        scheduler.advance(Duration::from_millis(30));

        assert_eq!(*log.lock(), vec!["early", "early-second", "late"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(30));
    }

    #[test]
    fn cancelled_task_never_runs() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        let handle = scheduler.schedule(Duration::from_millis(5), task("cancelled"));
        handle.cancel();
        scheduler.advance(Duration::from_secs(1));

        assert!(log.lock().is_empty());
    }

    #[test]
    fn clock_reads_due_time_while_task_runs() {
        let scheduler = ManualScheduler::new();
        let seen = Arc::new(Mutex::new(None));
        let inner = scheduler.clone();
        let seen_in_task = Arc::clone(&seen);

        scheduler.schedule(
            Duration::from_millis(7),
            Box::new(move || *seen_in_task.lock() = Some(inner.now().since_start())),
        );
        scheduler.advance(Duration::from_millis(100));

        assert_eq!(*seen.lock(), Some(Duration::from_millis(7)));
    }

    #[test]
    fn elapse_moves_clock_without_running_tasks() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.schedule(Duration::ZERO, task("zero"));
        scheduler.elapse(Duration::from_millis(40));

        assert!(log.lock().is_empty());
        assert_eq!(scheduler.elapsed(), Duration::from_millis(40));
    }
}
