//! Scheduling infrastructure shared by background timers

pub mod error;

pub use error::{SchedulerError, SchedulerResult};
