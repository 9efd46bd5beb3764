//! State management module
//! 
//! This module holds the countdown handle shared by the HTTP handlers and
//! the progress its callbacks publish.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use timer_state::{TimerState, TimerStatePublisher};
