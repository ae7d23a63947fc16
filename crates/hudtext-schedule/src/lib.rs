//! # hudtext-schedule
//!
//! Debounced delivery of display updates.
//!
//! A [`Scheduler`] turns a burst of "something changed, send it soon"
//! requests into a single flush, and never flushes one recipient more often
//! than its configured minimum interval. Pending flushes can be paused,
//! resumed with exactly the time they had left, or cancelled.
//!
//! ```no_run
//! use std::time::Duration;
//! use hudtext_schedule::{Priority, Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default())?;
//! scheduler.on_flush(|flush| println!("sending ({:?})", flush.priority));
//!
//! // Three changes in quick succession produce one flush.
//! scheduler.schedule_flush(Duration::from_millis(200), Priority::LOW);
//! scheduler.schedule_flush(Duration::from_millis(400), Priority::LOW);
//! scheduler.schedule_flush(Duration::from_millis(300), Priority::HIGH);
//! # Ok::<(), hudtext_schedule::ScheduleError>(())
//! ```
//!
//! Scheduler misuse, such as resuming an idle scheduler, is silently
//! ignored. The only failure is being unable to start the worker thread.

mod error;
mod governor;
mod scheduler;

pub use error::{Result, ScheduleError};
pub use governor::RateGovernor;
pub use scheduler::{
    Flush, Priority, Scheduler, SchedulerConfig, SchedulerHandle, SchedulerState,
    DEFAULT_MIN_INTERVAL,
};
