//! Story sequences
//!
//! A [`StorySequence`] plays a list of stories one after the other. Each
//! story is a pausable [`CountdownTimer`] segment with its own duration.
//! Skipping ends the current story at once, reversing steps back to the
//! previous one (or restarts the first).
//!
//! A segment's lock may be held while the sequence lock is taken, never the
//! other way round. The one exception is a segment being created under the
//! sequence lock, which nobody else can reach yet.

use std::{
    cell::RefCell,
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};
use parking_lot::ReentrantMutex;
use tracing::{debug, error};

use super::{
    countdown::CountdownTimer,
    listener::CountdownListener,
    scheduler::{Scheduler, TokioScheduler},
};
use crate::error::{Result, TimerError};

/// Receives story sequence notifications
pub trait SequenceListener: Send + Sync + 'static {
    /// Tick of the story at `index`
    fn on_progress(&self, _index: usize, _remaining: Duration) {}

    /// The next story is about to play
    fn on_next(&self);

    /// The previous story (or the first one again) is about to play
    fn on_prev(&self);

    /// The last story has ended
    fn on_complete(&self);
}

impl<L: SequenceListener + ?Sized> SequenceListener for Arc<L> {
    fn on_progress(&self, index: usize, remaining: Duration) {
        (**self).on_progress(index, remaining)
    }

    fn on_next(&self) {
        (**self).on_next()
    }

    fn on_prev(&self) {
        (**self).on_prev()
    }

    fn on_complete(&self) {
        (**self).on_complete()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Forward,
    Back,
}

struct SequenceState<S: Scheduler> {
    current: Option<usize>,
    segment: Option<CountdownTimer<S>>,
    complete: bool,
    cancelled: bool,
    /// Bumped on every story change; finishes from older segments are ignored
    epoch: u64,
}

struct SequenceInner<S: Scheduler> {
    durations: Vec<Duration>,
    interval: Duration,
    scheduler: S,
    listener: Box<dyn SequenceListener>,
    state: ReentrantMutex<RefCell<SequenceState<S>>>,
}

/// Handle to a sequence of pausable stories. Clones share the sequence.
pub struct StorySequence<S: Scheduler + Clone = TokioScheduler> {
    inner: Arc<SequenceInner<S>>,
}

impl<S: Scheduler + Clone> Clone for StorySequence<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl StorySequence<TokioScheduler> {
    /// One story per entry in `durations`, driven by the current tokio runtime
    pub fn new(
        durations: Vec<Duration>,
        interval: Duration,
        listener: impl SequenceListener,
    ) -> Result<Self> {
        Self::with_scheduler(durations, interval, TokioScheduler::new()?, listener)
    }

    /// `count` stories of the same length
    pub fn uniform(
        count: usize,
        duration: Duration,
        interval: Duration,
        listener: impl SequenceListener,
    ) -> Result<Self> {
        Self::new(vec![duration; count], interval, listener)
    }
}

impl<S: Scheduler + Clone> StorySequence<S> {
    pub fn with_scheduler(
        durations: Vec<Duration>,
        interval: Duration,
        scheduler: S,
        listener: impl SequenceListener,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(TimerError::ZeroInterval);
        }

        Ok(Self {
            inner: Arc::new(SequenceInner {
                durations,
                interval,
                scheduler,
                listener: Box::new(listener),
                state: ReentrantMutex::new(RefCell::new(SequenceState {
                    current: None,
                    segment: None,
                    complete: false,
                    cancelled: false,
                    epoch: 0,
                })),
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.durations.is_empty()
    }

    /// Index of the story playing (or last played)
    pub fn current(&self) -> Option<usize> {
        self.read(|state| state.current)
    }

    pub fn is_complete(&self) -> bool {
        self.read(|state| state.complete)
    }

    pub fn is_paused(&self) -> bool {
        self.segment().is_some_and(|segment| segment.is_paused())
    }

    /// Time left on the current story
    pub fn time_left(&self) -> Duration {
        self.segment()
            .map_or(Duration::ZERO, |segment| segment.time_left())
    }

    /// Start playing at story `from`; earlier stories count as seen.
    /// Does nothing once the sequence has started.
    pub fn start(&self, from: usize) -> Result<()> {
        let count = self.len();
        if from >= count {
            return Err(TimerError::StoryOutOfRange { index: from, count });
        }

        let guard = self.inner.state.lock();
        if self.read(|state| state.current.is_some() || state.cancelled) {
            debug!("story sequence already started");
            return Ok(());
        }

        debug!(from, count, "starting story sequence");
        self.play(&guard, from, |_| {});
        Ok(())
    }

    /// End the current story now and move to the next one
    pub fn skip(&self) {
        self.jump(Step::Forward);
    }

    /// Go back to the previous story; on the first story, restart it
    pub fn reverse(&self) {
        self.jump(Step::Back);
    }

    pub fn pause(&self) {
        if let Some(segment) = self.segment() {
            segment.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(segment) = self.segment() {
            segment.resume();
        }
    }

    /// Stop the sequence for good; no further notifications are delivered
    pub fn cancel(&self) {
        let segment = {
            let guard = self.inner.state.lock();
            let mut state = guard.borrow_mut();
            state.cancelled = true;
            state.epoch = state.epoch.wrapping_add(1);
            state.segment.take()
        };
        if let Some(segment) = segment {
            segment.cancel();
        }
        debug!("story sequence cancelled");
    }

    fn read<R>(&self, f: impl FnOnce(&SequenceState<S>) -> R) -> R {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        f(&*state)
    }

    fn segment(&self) -> Option<CountdownTimer<S>> {
        self.read(|state| state.segment.clone())
    }

    fn jump(&self, step: Step) {
        let (segment, epoch) = {
            let guard = self.inner.state.lock();
            let state = guard.borrow();
            if state.complete || state.cancelled || state.current.is_none() {
                return;
            }
            (state.segment.clone(), state.epoch)
        };

        // Silence the current story outside the sequence lock
        if let Some(segment) = segment {
            segment.cancel();
        }

        let guard = self.inner.state.lock();
        if guard.borrow().epoch != epoch {
            debug!(?step, "story changed before the jump landed");
            return;
        }
        self.step(&guard, step);
    }

    fn segment_finished(&self, epoch: u64) {
        let guard = self.inner.state.lock();
        if guard.borrow().epoch != epoch {
            return;
        }
        self.step(&guard, Step::Forward);
    }

    fn step(&self, cell: &RefCell<SequenceState<S>>, step: Step) {
        let current = {
            let state = cell.borrow();
            if state.complete || state.cancelled {
                return;
            }
            state.current
        };
        let Some(current) = current else {
            return;
        };

        match step {
            Step::Forward if current + 1 < self.len() => {
                self.play(cell, current + 1, |listener| listener.on_next());
            }
            Step::Forward => {
                {
                    let mut state = cell.borrow_mut();
                    state.complete = true;
                    state.segment = None;
                    state.epoch = state.epoch.wrapping_add(1);
                }
                debug!("story sequence complete");
                self.inner.listener.on_complete();
            }
            Step::Back => {
                self.play(cell, current.saturating_sub(1), |listener| listener.on_prev());
            }
        }
    }

    /// Make `index` the current story, notify, then start its segment
    /// unless the listener already moved the sequence elsewhere.
    fn play(
        &self,
        cell: &RefCell<SequenceState<S>>,
        index: usize,
        notify: impl FnOnce(&dyn SequenceListener),
    ) {
        let Some(duration) = self.inner.durations.get(index).copied() else {
            return;
        };

        let epoch = {
            let mut state = cell.borrow_mut();
            state.epoch = state.epoch.wrapping_add(1);
            state.current = Some(index);
            state.segment = None;
            state.epoch
        };

        notify(self.inner.listener.as_ref());
        if cell.borrow().epoch != epoch {
            return;
        }

        let listener = SegmentListener {
            sequence: Arc::downgrade(&self.inner),
            index,
            epoch,
        };
        let segment = match CountdownTimer::with_scheduler(
            duration,
            self.inner.interval,
            true,
            self.inner.scheduler.clone(),
            listener,
        ) {
            Ok(segment) => segment,
            Err(e) => {
                error!("Failed to build story {}: {}", index, e);
                return;
            }
        };

        debug!(index, duration_ms = duration.as_millis() as u64, "playing story");
        // Stored first: a zero-length story finishes inside create()
        cell.borrow_mut().segment = Some(segment.clone());
        segment.create();
    }
}

impl<S: Scheduler + Clone> fmt::Debug for StorySequence<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorySequence")
            .field("stories", &self.len())
            .field("current", &self.current())
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Bridges one segment's callbacks back to its sequence
struct SegmentListener<S: Scheduler + Clone> {
    sequence: Weak<SequenceInner<S>>,
    index: usize,
    epoch: u64,
}

impl<S: Scheduler + Clone> CountdownListener for SegmentListener<S> {
    fn on_tick(&self, remaining: Duration) {
        if let Some(inner) = self.sequence.upgrade() {
            inner.listener.on_progress(self.index, remaining);
        }
    }

    fn on_finish(&self) {
        if let Some(inner) = self.sequence.upgrade() {
            StorySequence { inner }.segment_finished(self.epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    };

    use parking_lot::Mutex;

    use super::*;
    use crate::timer::manual::ManualScheduler;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Progress(usize, u64),
        Next,
        Prev,
        Complete,
    }

    struct Recorder {
        clock: ManualScheduler,
        events: Mutex<Vec<(u64, Event)>>,
    }

    impl Recorder {
        fn new(clock: &ManualScheduler) -> Arc<Self> {
            Arc::new(Self {
                clock: clock.clone(),
                events: Mutex::new(Vec::new()),
            })
        }

        fn push(&self, event: Event) {
            let at = self.clock.elapsed().as_millis() as u64;
            self.events.lock().push((at, event));
        }

        fn events(&self) -> Vec<(u64, Event)> {
            self.events.lock().clone()
        }
    }

    impl SequenceListener for Recorder {
        fn on_progress(&self, index: usize, remaining: Duration) {
            self.push(Event::Progress(index, remaining.as_millis() as u64));
        }

        fn on_next(&self) {
            self.push(Event::Next);
        }

        fn on_prev(&self) {
            self.push(Event::Prev);
        }

        fn on_complete(&self) {
            self.push(Event::Complete);
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Stories of 300, 500 and 200ms; the interval is long enough that no
    /// story ever ticks
    fn sequence(
        clock: &ManualScheduler,
        recorder: &Arc<Recorder>,
    ) -> StorySequence<ManualScheduler> {
        StorySequence::with_scheduler(
            vec![ms(300), ms(500), ms(200)],
            ms(10_000),
            clock.clone(),
            Arc::clone(recorder),
        )
        .unwrap()
    }

    #[test]
    fn plays_each_story_in_turn() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        clock.advance(ms(2000));

        assert_eq!(
            recorder.events(),
            vec![(300, Event::Next), (800, Event::Next), (1000, Event::Complete)]
        );
        assert!(stories.is_complete());
        assert_eq!(stories.current(), Some(2));
        assert_eq!(stories.time_left(), Duration::ZERO);
    }

    #[test]
    fn start_from_later_story() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(1).unwrap();
        assert_eq!(stories.time_left(), ms(500));
        clock.advance(ms(2000));

        assert_eq!(
            recorder.events(),
            vec![(500, Event::Next), (700, Event::Complete)]
        );
    }

    #[test]
    fn start_out_of_range_is_rejected() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        assert_eq!(
            stories.start(3),
            Err(TimerError::StoryOutOfRange { index: 3, count: 3 })
        );
        assert_eq!(stories.current(), None);
    }

    #[test]
    fn second_start_is_ignored() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        stories.start(2).unwrap();

        assert_eq!(stories.current(), Some(0));
        assert_eq!(stories.time_left(), ms(300));
    }

    #[test]
    fn skip_ends_current_story_at_once() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        clock.advance(ms(100));
        stories.skip();

        assert_eq!(recorder.events(), vec![(100, Event::Next)]);
        assert_eq!(stories.current(), Some(1));
        assert_eq!(stories.time_left(), ms(500));

        clock.advance(ms(500));
        assert_eq!(recorder.events().last(), Some(&(600, Event::Next)));
    }

    #[test]
    fn skipping_last_story_completes_and_freezes_sequence() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(2).unwrap();
        stories.skip();
        stories.skip();
        stories.reverse();
        clock.advance(ms(2000));

        assert_eq!(recorder.events(), vec![(0, Event::Complete)]);
        assert!(stories.is_complete());
    }

    #[test]
    fn reverse_steps_back_to_previous_story() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(1).unwrap();
        clock.advance(ms(200));
        stories.reverse();

        assert_eq!(recorder.events(), vec![(200, Event::Prev)]);
        assert_eq!(stories.current(), Some(0));
        assert_eq!(stories.time_left(), ms(300));
    }

    #[test]
    fn reverse_on_first_story_restarts_it() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        clock.advance(ms(200));
        stories.reverse();
        assert_eq!(stories.current(), Some(0));
        assert_eq!(stories.time_left(), ms(300));

        clock.advance(ms(300));
        assert_eq!(
            recorder.events(),
            vec![(200, Event::Prev), (500, Event::Next)]
        );
    }

    #[test]
    fn pause_holds_the_current_story() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        clock.advance(ms(100));
        stories.pause();
        assert!(stories.is_paused());

        clock.advance(ms(5000));
        assert_eq!(stories.time_left(), ms(200));
        assert!(recorder.events().is_empty());

        stories.resume();
        clock.advance(ms(200));
        assert_eq!(recorder.events(), vec![(5300, Event::Next)]);
    }

    #[test]
    fn progress_is_reported_per_story() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = StorySequence::with_scheduler(
            vec![ms(2000), ms(2000)],
            ms(1000),
            clock.clone(),
            Arc::clone(&recorder),
        )
        .unwrap();

        stories.start(0).unwrap();
        clock.advance(ms(4000));

        assert_eq!(
            recorder.events(),
            vec![
                (0, Event::Progress(0, 2000)),
                (1000, Event::Progress(0, 1000)),
                (2000, Event::Next),
                (2000, Event::Progress(1, 2000)),
                (3000, Event::Progress(1, 1000)),
                (4000, Event::Complete),
            ]
        );
    }

    #[test]
    fn zero_length_story_passes_straight_through() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = StorySequence::with_scheduler(
            vec![Duration::ZERO, ms(300)],
            ms(10_000),
            clock.clone(),
            Arc::clone(&recorder),
        )
        .unwrap();

        stories.start(0).unwrap();

        assert_eq!(recorder.events(), vec![(0, Event::Next)]);
        assert_eq!(stories.current(), Some(1));
        assert_eq!(stories.time_left(), ms(300));
    }

    #[test]
    fn cancel_silences_the_sequence() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let stories = sequence(&clock, &recorder);

        stories.start(0).unwrap();
        clock.advance(ms(100));
        stories.cancel();
        stories.skip();
        clock.advance(ms(5000));

        assert!(recorder.events().is_empty());
        assert_eq!(clock.pending(), 0);
    }

    struct SkipOnFirstNext {
        recorder: Arc<Recorder>,
        sequence: OnceLock<StorySequence<ManualScheduler>>,
        skipped: AtomicBool,
    }

    impl SequenceListener for SkipOnFirstNext {
        fn on_next(&self) {
            self.recorder.on_next();
            if !self.skipped.swap(true, Ordering::SeqCst) {
                if let Some(sequence) = self.sequence.get() {
                    sequence.skip();
                }
            }
        }

        fn on_prev(&self) {
            self.recorder.on_prev();
        }

        fn on_complete(&self) {
            self.recorder.on_complete();
        }
    }

    #[test]
    fn listener_can_skip_from_on_next() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);
        let listener = Arc::new(SkipOnFirstNext {
            recorder: Arc::clone(&recorder),
            sequence: OnceLock::new(),
            skipped: AtomicBool::new(false),
        });
        let stories = StorySequence::with_scheduler(
            vec![ms(300), ms(500), ms(200)],
            ms(10_000),
            clock.clone(),
            Arc::clone(&listener),
        )
        .unwrap();
        listener.sequence.set(stories.clone()).unwrap();

        stories.start(0).unwrap();
        clock.advance(ms(2000));

        assert_eq!(
            recorder.events(),
            vec![(300, Event::Next), (300, Event::Next), (500, Event::Complete)]
        );
        assert_eq!(stories.current(), Some(2));
        stories.cancel();
    }

    #[test]
    fn zero_interval_is_rejected() {
        let clock = ManualScheduler::new();
        let recorder = Recorder::new(&clock);

        let result = StorySequence::with_scheduler(vec![ms(300)], Duration::ZERO, clock, recorder);

        assert!(matches!(result, Err(TimerError::ZeroInterval)));
    }
}
