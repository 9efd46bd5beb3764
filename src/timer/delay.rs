//! Drift correction for the tick loop

use std::time::Duration;

/// Delay until the next firing after a tick callback that took `spent`.
///
/// Whole intervals lost to a slow callback are skipped, never replayed.
pub fn next_tick_delay(interval: Duration, spent: Duration) -> Duration {
    if spent <= interval {
        return interval - spent;
    }

    let period = interval.as_nanos();
    if period == 0 {
        return Duration::ZERO;
    }
    let into_current = spent.as_nanos() % period;
    if into_current == 0 {
        Duration::ZERO
    } else {
        // into_current < period, so the difference fits whatever `interval` fits
        Duration::from_nanos(u64::try_from(period - into_current).unwrap_or(u64::MAX))
    }
}

/// Number of whole intervals skipped because a callback overran
pub fn skipped_intervals(interval: Duration, spent: Duration) -> u128 {
    match interval.as_nanos() {
        0 => 0,
        period => spent.as_nanos() / period,
    }
}
