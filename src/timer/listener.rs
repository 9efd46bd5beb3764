//! Tick and finish callbacks supplied by the host

use std::{sync::Arc, time::Duration};

/// Receives countdown notifications.
///
/// Both methods run while the timer's lock is held, so a notification never
/// starts before the previous one has returned. Calling back into the same
/// timer (pause, cancel, queries) from here is allowed.
pub trait CountdownListener: Send + Sync + 'static {
    /// Called on every interval with the time still remaining
    fn on_tick(&self, remaining: Duration);

    /// Called once when the countdown reaches zero
    fn on_finish(&self);
}

impl<L: CountdownListener + ?Sized> CountdownListener for Arc<L> {
    fn on_tick(&self, remaining: Duration) {
        (**self).on_tick(remaining)
    }

    fn on_finish(&self) {
        (**self).on_finish()
    }
}

/// Listener built from two closures
pub struct FnListener<T, F> {
    on_tick: T,
    on_finish: F,
}

impl<T, F> FnListener<T, F>
where
    T: Fn(Duration) + Send + Sync + 'static,
    F: Fn() + Send + Sync + 'static,
{
    pub fn new(on_tick: T, on_finish: F) -> Self {
        Self { on_tick, on_finish }
    }
}

impl<T, F> CountdownListener for FnListener<T, F>
where
    T: Fn(Duration) + Send + Sync + 'static,
    F: Fn() + Send + Sync + 'static,
{
    fn on_tick(&self, remaining: Duration) {
        (self.on_tick)(remaining)
    }

    fn on_finish(&self) {
        (self.on_finish)()
    }
}

/// Shorthand for [`FnListener::new`]
pub fn listener_fn<T, F>(on_tick: T, on_finish: F) -> FnListener<T, F>
where
    T: Fn(Duration) + Send + Sync + 'static,
    F: Fn() + Send + Sync + 'static,
{
    FnListener::new(on_tick, on_finish)
}
