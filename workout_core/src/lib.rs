#![forbid(unsafe_code)]

//! Core domain model and business logic for the Lift workout tracker.
//!
//! This crate provides:
//! - Domain types (routines, logged sets, snapshots, summaries)
//! - The session engine (session timer, rest timer, set progression)
//! - Weekly schedule and same-day override resolution
//! - Persistence (planner state, WAL, CSV archive, completion flag)
//! - Routine library and configuration

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod session_timer;
pub mod rest_timer;
pub mod progression;
pub mod session;
pub mod schedule;
pub mod planner_store;
pub mod wal;
pub mod submission;
pub mod history;
pub mod csv_rollup;
pub mod routines;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{
    format_clock, format_rest, parse_clock, Clock, ManualClock, OffsetClock, SecondTicker, SystemClock,
};
pub use config::Config;
pub use rest_timer::{RestExpiry, RestSkip};
pub use progression::{SetOutcome, WorkoutExercise};
pub use session::SessionController;
pub use schedule::{check_expiry, parse_weekday, resolve_today_routine, weekday_name, ScheduleResolver};
pub use planner_store::{FilePlannerStore, MemoryPlannerStore, PlannerStore};
pub use wal::{JsonlSink, WorkoutSink};
pub use submission::{broadcast, submit, CompletionFlagFile, CompletionListener, FinishSubmission};
pub use history::{has_logged_today, load_recent_workouts};
pub use routines::{ad_hoc_exercise, RoutineBook};
