//! Core domain types for the workout session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Routines and their planned sets (immutable session inputs)
//! - Logged sets and session status
//! - Read-only snapshots handed to the UI shell
//! - Weekly schedule and same-day override values
//! - Summary and notice values handed to external collaborators

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name used for sessions opened without a routine
pub const STANDALONE_WORKOUT_NAME: &str = "Standalone Workout";

// ============================================================================
// Routine Types
// ============================================================================

/// A target set defined by a routine, not yet performed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedSet {
    pub reps: i32,
    #[serde(default)]
    pub weight: f64,
}

impl PlannedSet {
    pub fn new(weight: f64, reps: i32) -> Self {
        Self { reps, weight }
    }
}

/// One exercise of a routine: identity, planned sets and rest setting
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub sets: Vec<PlannedSet>,
    /// Rest between sets; accepts `"MM:SS"` or integer seconds in routine files
    #[serde(
        rename = "rest",
        default = "crate::clock::default_rest_seconds",
        deserialize_with = "crate::clock::deserialize_rest",
        serialize_with = "crate::clock::serialize_rest"
    )]
    pub rest_seconds: u32,
}

/// A routine template (immutable input to a session)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseSpec>,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// Session Types
// ============================================================================

/// A recorded outcome for a performed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    pub weight: f64,
    pub reps: i32,
    /// Rest actually taken after this set, in whole seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_time_actual: Option<u32>,
}

/// Units the user logs weights in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn weight_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "kg",
            UnitSystem::Imperial => "lbs",
        }
    }
}

/// Lifecycle of a workout session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Running,
    Paused,
    Completed,
}

/// Lifecycle of the rest countdown
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestStatus {
    #[default]
    Idle,
    Counting,
    Expired,
}

/// Snapshot of the rest countdown
#[derive(Clone, Debug, Serialize, PartialEq, Default)]
pub struct RestTimerState {
    pub status: RestStatus,
    pub remaining_seconds: u32,
    pub planned_seconds: u32,
    pub bound_exercise_index: Option<usize>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Snapshot of one session exercise
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExerciseSnapshot {
    pub name: String,
    pub planned_sets: Vec<PlannedSet>,
    pub completed_sets: Vec<LoggedSet>,
    pub current_set_index: usize,
    pub rest_seconds: u32,
    pub is_complete: bool,
}

/// Immutable view of a session for rendering
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub routine_name: String,
    pub elapsed_seconds: u64,
    pub exercises: Vec<ExerciseSnapshot>,
    pub rest: RestTimerState,
}

/// Logged sets of one exercise, as handed to persistence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub name: String,
    pub rest_seconds: u32,
    pub sets: Vec<LoggedSet>,
}

/// A completed session, emitted by `finish()` for the persistence collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub routine_id: Option<String>,
    pub routine_name: String,
    pub exercises: Vec<ExerciseSummary>,
    pub elapsed_seconds: u64,
    pub duration_minutes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    /// Local calendar day the session was finished on
    pub performed_on: NaiveDate,
}

impl SessionSummary {
    /// Total number of logged sets across all exercises
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Fire-and-forget notification that a session was submitted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub workout_name: String,
    pub duration_minutes: u32,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Schedule Types
// ============================================================================

/// Weekday name (`"monday".."sunday"`) to routine id; empty string means rest day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct WeeklySchedule {
    pub(crate) days: BTreeMap<String, String>,
}

/// Same-day manual routine choice
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryOverride {
    pub routine_id: String,
    pub date: NaiveDate,
}

/// Where today's routine came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutineSource {
    Override,
    Weekly,
}
