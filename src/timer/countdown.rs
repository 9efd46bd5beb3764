//! Pausable countdown timer
//!
//! A [`CountdownTimer`] counts a fixed duration down on a monotonic clock,
//! reporting the time left every `interval` and firing a terminal callback
//! at zero. It can be paused and resumed any number of times without losing
//! accuracy: while paused the remaining time is frozen, on resume the clock
//! starts counting it down again from the current instant.
//!
//! All state changes and every callback run under one re-entrant lock owned
//! by the timer, so deliveries are strictly ordered and never observe a
//! half-finished pause or resume.

use std::{
    cell::RefCell,
    fmt,
    sync::Arc,
    time::Duration,
};
use parking_lot::ReentrantMutex;
use tracing::{debug, trace, warn};

use super::{
    delay::{next_tick_delay, skipped_intervals},
    listener::CountdownListener,
    scheduler::{ScheduledTask, Scheduler, TokioScheduler},
};
use crate::error::{Result, TimerError};

#[derive(Debug, Clone, Copy)]
enum Phase<I> {
    /// Frozen with this much time left
    Paused { remaining: Duration },
    /// Resumed at `since` with `remaining` left; the deadline is
    /// `since + remaining`, kept split so no instant arithmetic can overflow
    Running { since: I, remaining: Duration },
}

struct State<S: Scheduler> {
    phase: Phase<S::Instant>,
    created: bool,
    started: bool,
    finished: bool,
    cancelled: bool,
    /// Bumped whenever pending work is withdrawn; firings carrying an older
    /// value are discarded.
    generation: u64,
    pending: Option<S::Handle>,
}

impl<S: Scheduler> State<S> {
    fn withdraw_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
            && !self.cancelled
            && !self.finished
            && matches!(self.phase, Phase::Running { .. })
    }
}

struct Inner<S: Scheduler> {
    total: Duration,
    interval: Duration,
    auto_start: bool,
    scheduler: S,
    listener: Box<dyn CountdownListener>,
    state: ReentrantMutex<RefCell<State<S>>>,
}

impl<S: Scheduler> Drop for Inner<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.state.get_mut().get_mut().pending.take() {
            pending.cancel();
        }
    }
}

/// Point-in-time view of a timer, read under a single lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownSnapshot {
    pub time_left: Duration,
    pub time_passed: Duration,
    pub total: Duration,
    pub interval: Duration,
    pub paused: bool,
    pub started: bool,
    pub finished: bool,
    pub cancelled: bool,
}

/// Handle to a pausable countdown.
///
/// Clones share the same timer. Scheduled firings only hold a weak
/// reference, so dropping every handle stops delivery.
pub struct CountdownTimer<S: Scheduler = TokioScheduler> {
    inner: Arc<Inner<S>>,
}

impl<S: Scheduler> Clone for CountdownTimer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CountdownTimer<TokioScheduler> {
    /// Build a timer driven by the tokio runtime of the calling context
    pub fn new(
        total: Duration,
        interval: Duration,
        auto_start: bool,
        listener: impl CountdownListener,
    ) -> Result<Self> {
        Self::with_scheduler(total, interval, auto_start, TokioScheduler::new()?, listener)
    }
}

impl<S: Scheduler> CountdownTimer<S> {
    /// Build a timer on an arbitrary scheduler. Nothing runs until
    /// [`create`](Self::create) is called.
    pub fn with_scheduler(
        total: Duration,
        interval: Duration,
        auto_start: bool,
        scheduler: S,
        listener: impl CountdownListener,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                total,
                interval,
                auto_start,
                scheduler,
                listener: Box::new(listener),
                state: ReentrantMutex::new(RefCell::new(State {
                    phase: Phase::Paused { remaining: total },
                    created: false,
                    started: false,
                    finished: false,
                    cancelled: false,
                    generation: 0,
                    pending: None,
                })),
            }),
        })
    }

    /// Initialize the countdown.
    ///
    /// A zero duration fires `on_finish` right here and the timer never
    /// runs. Otherwise the timer starts paused with the full duration left,
    /// and resumes immediately when built with `auto_start`. Calling this a
    /// second time does nothing.
    pub fn create(self) -> Self {
        let guard = self.inner.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.created {
                debug!("countdown already created");
                drop(state);
                drop(guard);
                return self;
            }
            state.created = true;

            if self.inner.total.is_zero() {
                state.finished = true;
                state.phase = Phase::Paused {
                    remaining: Duration::ZERO,
                };
            }
        }

        if self.inner.total.is_zero() {
            debug!("countdown created with no time on it, finishing at once");
            self.inner.listener.on_finish();
        } else {
            debug!(
                total_ms = self.inner.total.as_millis() as u64,
                interval_ms = self.inner.interval.as_millis() as u64,
                auto_start = self.inner.auto_start,
                "countdown created"
            );
            if self.inner.auto_start {
                self.resume();
            }
        }

        drop(guard);
        self
    }

    /// Freeze the remaining time and stop delivering ticks. No-op when
    /// already paused or finished.
    pub fn pause(&self) {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();

        let (since, remaining) = match state.phase {
            Phase::Running { since, remaining } => (since, remaining),
            Phase::Paused { .. } => return,
        };
        if state.finished {
            return;
        }

        let remaining = self.remaining_after(since, remaining);
        state.phase = Phase::Paused { remaining };
        state.withdraw_pending();
        debug!(remaining_ms = remaining.as_millis() as u64, "countdown paused");
    }

    /// Restart ticking from the frozen remaining time. No-op when already
    /// running or finished.
    ///
    /// Do not resume a cancelled timer: the call is refused and logged.
    pub fn resume(&self) {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();

        let remaining = match state.phase {
            Phase::Paused { remaining } => remaining,
            Phase::Running { .. } => return,
        };
        if state.finished {
            return;
        }
        if state.cancelled {
            warn!("resume called on a cancelled countdown, ignoring");
            return;
        }

        state.phase = Phase::Running {
            since: self.inner.scheduler.now(),
            remaining,
        };
        state.started = true;
        debug!(remaining_ms = remaining.as_millis() as u64, "countdown resumed");

        // Let the delivery loop decide what happens first
        self.schedule_next(&mut state, Duration::ZERO);
    }

    /// Withdraw any pending firing. No callback is delivered afterwards.
    /// Remaining time is left as it was.
    pub fn cancel(&self) {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();

        if !state.cancelled {
            debug!("countdown cancelled");
        }
        state.cancelled = true;
        state.withdraw_pending();
    }

    /// Time until the countdown finishes, never negative
    pub fn time_left(&self) -> Duration {
        self.read(|state| self.time_left_of(state))
    }

    /// Time consumed so far: `total_countdown() - time_left()`
    pub fn time_passed(&self) -> Duration {
        self.inner.total.saturating_sub(self.time_left())
    }

    pub fn total_countdown(&self) -> Duration {
        self.inner.total
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn is_paused(&self) -> bool {
        self.read(|state| matches!(state.phase, Phase::Paused { .. }))
    }

    pub fn is_running(&self) -> bool {
        !self.is_paused()
    }

    /// True once the timer has been resumed at least once
    pub fn has_been_started(&self) -> bool {
        self.read(|state| state.started)
    }

    /// True once `on_finish` has been delivered
    pub fn is_finished(&self) -> bool {
        self.read(|state| state.finished)
    }

    pub fn is_cancelled(&self) -> bool {
        self.read(|state| state.cancelled)
    }

    pub fn snapshot(&self) -> CountdownSnapshot {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        let time_left = self.time_left_of(&state);

        CountdownSnapshot {
            time_left,
            time_passed: self.inner.total.saturating_sub(time_left),
            total: self.inner.total,
            interval: self.inner.interval,
            paused: matches!(state.phase, Phase::Paused { .. }),
            started: state.started,
            finished: state.finished,
            cancelled: state.cancelled,
        }
    }

    fn read<R>(&self, f: impl FnOnce(&State<S>) -> R) -> R {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        f(&*state)
    }

    fn time_left_of(&self, state: &State<S>) -> Duration {
        match state.phase {
            Phase::Paused { remaining } => remaining,
            Phase::Running { since, remaining } => self.remaining_after(since, remaining),
        }
    }

    fn remaining_after(&self, since: S::Instant, remaining: Duration) -> Duration {
        let now = self.inner.scheduler.now();
        if now > since {
            remaining.saturating_sub(now - since)
        } else {
            remaining
        }
    }

    fn schedule_next(&self, state: &mut State<S>, delay: Duration) {
        state.withdraw_pending();
        let generation = state.generation;
        let weak = Arc::downgrade(&self.inner);

        let handle = self.inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    CountdownTimer { inner }.deliver(generation);
                }
            }),
        );
        state.pending = Some(handle);
    }

    /// One step of the delivery loop
    fn deliver(&self, generation: u64) {
        let guard = self.inner.state.lock();
        let interval = self.inner.interval;

        let left = {
            let mut state = guard.borrow_mut();
            if !state.is_current(generation) {
                trace!(generation, "stale firing discarded");
                return;
            }
            // Already fired; dropping the handle detaches it
            state.pending = None;
            self.time_left_of(&state)
        };

        if left.is_zero() {
            {
                let mut state = guard.borrow_mut();
                state.finished = true;
                state.withdraw_pending();
            }
            debug!("countdown finished");
            self.inner.listener.on_finish();
            return;
        }

        if left < interval {
            // Wait out the remainder without a tick so the finish lands on time
            trace!(left_ms = left.as_millis() as u64, "final stretch");
            let mut state = guard.borrow_mut();
            self.schedule_next(&mut state, left);
            return;
        }

        trace!(left_ms = left.as_millis() as u64, "delivering tick");
        let tick_start = self.inner.scheduler.now();
        self.inner.listener.on_tick(left);
        let spent = self.inner.scheduler.now() - tick_start;

        let mut state = guard.borrow_mut();
        // The callback may have paused, cancelled or restarted the timer
        if !state.is_current(generation) {
            return;
        }

        if spent > interval {
            warn!(
                spent_ms = spent.as_millis() as u64,
                skipped = skipped_intervals(interval, spent) as u64,
                "tick callback overran the interval, skipping ahead"
            );
        }
        self.schedule_next(&mut state, next_tick_delay(interval, spent));
    }
}

impl<S: Scheduler> fmt::Debug for CountdownTimer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
