//! Handing finished sessions to the outside world.
//!
//! - [`FinishSubmission`] is the outbound payload of the finish call.
//! - [`submit`] pushes a summary through a [`WorkoutSink`]; any failure becomes
//!   [`Error::Submission`] and the caller keeps the completed session for retry.
//! - Completion listeners receive a fire-and-forget [`CompletionNotice`].

use crate::clock::{format_clock, format_rest};
use crate::planner_store::user_file_stem;
use crate::wal::WorkoutSink;
use crate::{CompletionNotice, Error, Result, SessionSummary, UnitSystem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One logged set in the submission payload
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedSet {
    pub weight: f64,
    pub reps: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_time: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedExercise {
    pub name: String,
    pub sets: Vec<SubmittedSet>,
    pub rest_timer: String,
    pub unit_system: UnitSystem,
}

/// Body of the finish-submission call
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishSubmission {
    pub routine_name: String,
    pub exercises_completed: Vec<SubmittedExercise>,
    pub duration_minutes: u32,
    pub shared_with: Vec<String>,
}

impl From<&SessionSummary> for FinishSubmission {
    fn from(summary: &SessionSummary) -> Self {
        Self::with_units(summary, UnitSystem::default())
    }
}

impl FinishSubmission {
    /// Build the payload, tagging every exercise with the user's units
    pub fn with_units(summary: &SessionSummary, unit_system: UnitSystem) -> Self {
        let exercises_completed = summary
            .exercises
            .iter()
            .filter(|e| !e.sets.is_empty())
            .map(|e| SubmittedExercise {
                name: e.name.clone(),
                sets: e
                    .sets
                    .iter()
                    .map(|s| SubmittedSet {
                        weight: s.weight,
                        reps: s.reps,
                        rest_time: s.rest_time_actual.map(|r| format_clock(u64::from(r))),
                    })
                    .collect(),
                rest_timer: format_rest(e.rest_seconds),
                unit_system,
            })
            .collect();

        FinishSubmission {
            routine_name: summary.routine_name.clone(),
            exercises_completed,
            duration_minutes: summary.duration_minutes,
            shared_with: Vec::new(),
        }
    }
}

impl From<&SessionSummary> for CompletionNotice {
    fn from(summary: &SessionSummary) -> Self {
        CompletionNotice {
            workout_name: summary.routine_name.clone(),
            duration_minutes: summary.duration_minutes,
            timestamp: summary.finished_at,
        }
    }
}

/// Hand a finished session to `sink`
///
/// Never retries; a failure is reported as [`Error::Submission`] so the user
/// can trigger the retry.
pub fn submit(summary: &SessionSummary, sink: &mut dyn WorkoutSink) -> Result<()> {
    match sink.append(summary) {
        Ok(()) => {
            tracing::info!("Submitted workout {} ('{}')", summary.id, summary.routine_name);
            Ok(())
        }
        Err(Error::Submission(msg)) => Err(Error::Submission(msg)),
        Err(e) => {
            tracing::warn!("Submission of workout {} failed: {}", summary.id, e);
            Err(Error::Submission(e.to_string()))
        }
    }
}

/// Receiver of session-completion notices
pub trait CompletionListener {
    fn on_completed(&mut self, notice: &CompletionNotice) -> Result<()>;
}

/// Notify every listener; failures are logged and otherwise ignored
pub fn broadcast(listeners: &mut [Box<dyn CompletionListener>], notice: &CompletionNotice) {
    for listener in listeners.iter_mut() {
        if let Err(e) = listener.on_completed(notice) {
            tracing::warn!("Completion listener failed: {}", e);
        }
    }
}

/// Contents of the "completed today" flag file
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionFlag {
    pub completed: bool,
    pub workout_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Writes a per-user flag file other views poll to refresh themselves
pub struct CompletionFlagFile {
    path: PathBuf,
}

impl CompletionFlagFile {
    pub fn new(data_dir: &Path, user_id: &str) -> Self {
        Self {
            path: data_dir
                .join("flags")
                .join(format!("workout_completed_today_{}.json", user_file_stem(user_id))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<CompletionFlag>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl CompletionListener for CompletionFlagFile {
    fn on_completed(&mut self, notice: &CompletionNotice) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let flag = CompletionFlag {
            completed: true,
            workout_name: notice.workout_name.clone(),
            timestamp: notice.timestamp,
        };
        std::fs::write(&self.path, serde_json::to_string(&flag)?)?;
        tracing::debug!("Wrote completion flag to {:?}", self.path);
        Ok(())
    }
}
