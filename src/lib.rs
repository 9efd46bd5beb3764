//! Pausable Countdown - a drift-correcting countdown timer that survives
//! pause and resume
//! 
//! The core lives in [`timer`]. The remaining modules wire one countdown into
//! a small HTTP service used by the `countdown-server` binary.

pub mod config;
pub mod error;
pub mod timer;
pub mod state;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::TimerError;
pub use timer::{
    listener_fn, CountdownListener, CountdownSnapshot, CountdownTimer, ManualScheduler,
    Scheduler, SequenceListener, StorySequence, TokioScheduler,
};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
