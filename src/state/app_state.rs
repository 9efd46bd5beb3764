//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::info;

use super::{TimerState, TimerStatePublisher};
use crate::{
    config::Config,
    error::Result,
    timer::{CountdownSnapshot, CountdownTimer},
};

/// Main application state: the countdown and what has happened to it
#[derive(Debug)]
pub struct AppState {
    /// The countdown under control
    pub timer: CountdownTimer,
    /// Progress published by the countdown's callbacks
    pub timer_update_rx: watch::Receiver<TimerState>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Build the countdown from the configuration. Must be called inside a
    /// tokio runtime.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_countdown(
            config.port,
            config.host.clone(),
            config.duration(),
            config.interval(),
            config.auto_start(),
        )
    }

    /// Build the countdown from explicit parameters
    pub fn with_countdown(
        port: u16,
        host: String,
        total: Duration,
        interval: Duration,
        auto_start: bool,
    ) -> Result<Self> {
        let (timer_update_tx, timer_update_rx) = watch::channel(TimerState::new());
        let timer = CountdownTimer::new(
            total,
            interval,
            auto_start,
            TimerStatePublisher::new(timer_update_tx),
        )?
        .create();

        Ok(Self {
            timer,
            timer_update_rx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        })
    }

    /// Pause the countdown
    pub fn pause(&self) -> CountdownSnapshot {
        info!("Pausing countdown");
        self.record_action("pause");
        self.timer.pause();
        self.timer.snapshot()
    }

    /// Resume the countdown
    pub fn resume(&self) -> CountdownSnapshot {
        info!("Resuming countdown");
        self.record_action("resume");
        self.timer.resume();
        self.timer.snapshot()
    }

    /// Cancel the countdown for good
    pub fn cancel(&self) -> CountdownSnapshot {
        info!("Cancelling countdown");
        self.record_action("cancel");
        self.timer.cancel();
        self.timer.snapshot()
    }

    /// Get current timer progress
    pub fn get_timer_state(&self) -> TimerState {
        self.timer_update_rx.borrow().clone()
    }

    /// Subscribe to timer progress updates
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.timer_update_rx.clone()
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
