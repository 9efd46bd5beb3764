//! Countdown core
//!
//! The state machine lives in [`countdown`]; it depends only on the narrow
//! [`Scheduler`] seam for its clock and deferred firings. [`sequence`]
//! chains countdowns into a list of stories.

pub mod countdown;
pub mod delay;
pub mod listener;
pub mod manual;
pub mod scheduler;
pub mod sequence;

pub use countdown::{CountdownSnapshot, CountdownTimer};
pub use listener::{listener_fn, CountdownListener, FnListener};
pub use manual::{ManualInstant, ManualScheduler};
pub use scheduler::{ScheduledTask, Scheduler, Task, TokioScheduler};
pub use sequence::{SequenceListener, StorySequence};
