//! Countdown progress monitor task

use tokio::sync::watch;
use tracing::{info, warn};

use crate::state::TimerState;

/// Background task that logs countdown progress and returns once the
/// countdown has finished
pub async fn countdown_monitor_task(mut timer_rx: watch::Receiver<TimerState>) {
    info!("Starting countdown monitor task");

    loop {
        let progress = timer_rx.borrow_and_update().clone();

        if progress.finished {
            info!("Countdown finished after {} ticks", progress.ticks);
            return;
        }
        if let Some(remaining) = progress.last_tick_remaining_ms {
            info!("Countdown: {}s remaining", remaining / 1000);
        }

        if timer_rx.changed().await.is_err() {
            warn!("Countdown progress channel closed, stopping monitor");
            return;
        }
    }
}
