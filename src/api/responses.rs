//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::CountdownSnapshot;

/// Countdown values in milliseconds, as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub time_left_ms: u64,
    pub time_passed_ms: u64,
    pub total_ms: u64,
    pub interval_ms: u64,
    pub paused: bool,
    pub started: bool,
    pub finished: bool,
    pub cancelled: bool,
}

impl From<CountdownSnapshot> for TimerStatus {
    fn from(snapshot: CountdownSnapshot) -> Self {
        Self {
            time_left_ms: snapshot.time_left.as_millis() as u64,
            time_passed_ms: snapshot.time_passed.as_millis() as u64,
            total_ms: snapshot.total.as_millis() as u64,
            interval_ms: snapshot.interval.as_millis() as u64,
            paused: snapshot.paused,
            started: snapshot.started,
            finished: snapshot.finished,
            cancelled: snapshot.cancelled,
        }
    }
}

/// API response structure for control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerStatus,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerStatus) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// The countdown is running
    pub fn running(message: String, timer: TimerStatus) -> Self {
        Self::new("running".to_string(), message, timer)
    }

    /// The countdown is paused
    pub fn paused(message: String, timer: TimerStatus) -> Self {
        Self::new("paused".to_string(), message, timer)
    }

    /// The countdown is over (finished or cancelled)
    pub fn inactive(message: String, timer: TimerStatus) -> Self {
        Self::new("inactive".to_string(), message, timer)
    }

    /// Create an error response
    pub fn error(message: String, timer: TimerStatus) -> Self {
        Self::new("error".to_string(), message, timer)
    }
}

/// Status response with countdown progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerStatus,
    pub ticks: u64,
    pub last_tick_remaining_ms: Option<u64>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
