//! Timer progress as seen by the host

use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::timer::CountdownListener;

/// Progress published by the countdown's callbacks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Number of ticks delivered so far
    pub ticks: u64,
    /// Time left reported by the most recent tick
    pub last_tick_remaining_ms: Option<u64>,
    /// Set once the terminal callback has fired
    pub finished: bool,
}

impl TimerState {
    /// Create a state with nothing delivered yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered tick
    pub fn ticked(&mut self, remaining: Duration) {
        self.ticks += 1;
        self.last_tick_remaining_ms = Some(remaining.as_millis() as u64);
    }

    /// Record the terminal callback
    pub fn finish(&mut self) {
        self.finished = true;
    }
}

/// Listener that pushes every callback into a watch channel
#[derive(Debug)]
pub struct TimerStatePublisher {
    tx: watch::Sender<TimerState>,
}

impl TimerStatePublisher {
    pub fn new(tx: watch::Sender<TimerState>) -> Self {
        Self { tx }
    }
}

impl CountdownListener for TimerStatePublisher {
    fn on_tick(&self, remaining: Duration) {
        debug!("Tick: {}ms remaining", remaining.as_millis());
        self.tx.send_modify(|state| state.ticked(remaining));
    }

    fn on_finish(&self) {
        info!("Countdown finished");
        self.tx.send_modify(TimerState::finish);
    }
}
