//! Utility functions module
//! 
//! Process-level helpers for the countdown server.

pub mod signals;

pub use signals::shutdown_signal;
