//! Daily scheduled composition.

pub mod cadence;
pub mod daemon;

pub use cadence::DailyCadence;
pub use daemon::{ScheduleHandle, spawn_daily_digest};
