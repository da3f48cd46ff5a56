//! Workout session controller.
//!
//! Composes the session stopwatch, per-exercise set progression and the single
//! rest countdown into one state machine:
//!
//! ```text
//! NotStarted --start--> Running <--pause/resume--> Paused
//!                       Running | Paused --finish--> Completed
//! ```
//!
//! The controller is driven by discrete commands plus a once-per-second
//! [`SessionController::tick`]. Every failing command leaves the session
//! exactly as it was. The rest countdown is owned here, so at most one can be
//! counting at any time.

use crate::clock::Clock;
use crate::progression::{SetOutcome, WorkoutExercise};
use crate::rest_timer::{RestExpiry, RestSkip, RestTimer};
use crate::session_timer::SessionTimer;
use crate::{
    Error, ExerciseSpec, LoggedSet, Result, RestTimerState, Routine, SessionSnapshot,
    SessionStatus, SessionSummary, STANDALONE_WORKOUT_NAME,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One workout-logging session
pub struct SessionController {
    routine_id: Option<String>,
    routine_name: String,
    status: SessionStatus,
    exercises: Vec<WorkoutExercise>,
    timer: SessionTimer,
    rest: RestTimer,
    clock: Box<dyn Clock>,
    started_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
}

impl SessionController {
    /// Open a session for `routine`, or an empty ad-hoc session when `None`
    pub fn new(routine: Option<&Routine>, clock: impl Clock + 'static) -> Self {
        let (routine_id, routine_name, exercises) = match routine {
            Some(r) => (
                Some(r.id.clone()),
                r.name.clone(),
                r.exercises.iter().cloned().map(WorkoutExercise::new).collect(),
            ),
            None => (None, STANDALONE_WORKOUT_NAME.to_string(), Vec::new()),
        };

        tracing::debug!(
            "Opened session '{}' with {} exercises",
            routine_name,
            exercises.len()
        );

        Self {
            routine_id,
            routine_name,
            status: SessionStatus::NotStarted,
            exercises,
            timer: SessionTimer::new(),
            rest: RestTimer::new(),
            clock: Box::new(clock),
            started_at: None,
            summary: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn routine_name(&self) -> &str {
        &self.routine_name
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn exercises(&self) -> &[WorkoutExercise] {
        &self.exercises
    }

    pub fn exercise(&self, index: usize) -> Option<&WorkoutExercise> {
        self.exercises.get(index)
    }

    pub fn rest_state(&self) -> RestTimerState {
        self.rest.state()
    }

    /// Summary emitted by a successful `finish()`, kept for submission retries
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            routine_name: self.routine_name.clone(),
            elapsed_seconds: self.timer.elapsed_seconds(),
            exercises: self.exercises.iter().map(WorkoutExercise::snapshot).collect(),
            rest: self.rest.state(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.status == SessionStatus::Completed {
            return Err(Error::State("Session is already completed".into()));
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        match self.status {
            SessionStatus::Running | SessionStatus::Paused => Ok(()),
            SessionStatus::NotStarted => Err(Error::State("Session has not been started".into())),
            SessionStatus::Completed => Err(Error::State("Session is already completed".into())),
        }
    }

    fn exercise_mut(&mut self, index: usize) -> Result<&mut WorkoutExercise> {
        let count = self.exercises.len();
        self.exercises
            .get_mut(index)
            .ok_or_else(|| Error::State(format!("No exercise {} (session has {})", index, count)))
    }

    // ------------------------------------------------------------------------
    // Exercise list
    // ------------------------------------------------------------------------

    /// Append an exercise; returns its index
    pub fn add_exercise(&mut self, spec: ExerciseSpec) -> Result<usize> {
        self.ensure_open()?;
        tracing::debug!("Added exercise '{}'", spec.name);
        self.exercises.push(WorkoutExercise::new(spec));
        Ok(self.exercises.len() - 1)
    }

    /// Remove an exercise; a rest countdown bound to it is cancelled
    pub fn remove_exercise(&mut self, index: usize) -> Result<ExerciseSpec> {
        self.ensure_open()?;
        self.exercise_mut(index)?;

        let removed = self.exercises.remove(index);
        self.rest.exercise_removed(index);
        tracing::debug!("Removed exercise '{}'", removed.name());
        Ok(removed.spec().clone())
    }

    pub fn add_planned_set(&mut self, index: usize, weight: f64, reps: i32) -> Result<()> {
        self.ensure_open()?;
        self.exercise_mut(index)?.add_planned_set(weight, reps)
    }

    pub fn remove_planned_set(&mut self, index: usize, set_index: usize) -> Result<()> {
        self.ensure_open()?;
        self.exercise_mut(index)?.remove_planned_set(set_index)?;
        Ok(())
    }

    /// Change an exercise's rest setting; a countdown already running keeps its duration
    pub fn set_rest_duration(&mut self, index: usize, seconds: u32) -> Result<()> {
        self.ensure_open()?;
        self.exercise_mut(index)?.set_rest_seconds(seconds);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn start(&mut self) -> Result<()> {
        if self.status != SessionStatus::NotStarted {
            return Err(Error::State(format!(
                "Cannot start a session that is {:?}",
                self.status
            )));
        }
        if self.exercises.is_empty() {
            return Err(Error::EmptySession);
        }

        self.status = SessionStatus::Running;
        self.started_at = Some(self.clock.now());
        self.timer.start();
        tracing::info!("Started session '{}'", self.routine_name);
        Ok(())
    }

    /// Freeze the session stopwatch; the rest countdown keeps going
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.timer.pause();
        self.status = SessionStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.timer.resume();
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// One second of real time has passed
    ///
    /// Returns the rest expiry if the countdown reached zero on this tick; the
    /// planned duration has then been recorded on the bound exercise's last set.
    pub fn tick(&mut self) -> Option<RestExpiry> {
        self.timer.tick();

        let expiry = self.rest.tick()?;
        if let Some(exercise) = self.exercises.get_mut(expiry.exercise_index) {
            exercise.record_rest(expiry.planned_seconds, false);
        }
        tracing::debug!(
            "Rest expired for exercise {} after {}s",
            expiry.exercise_index,
            expiry.planned_seconds
        );
        Some(expiry)
    }

    /// Apply `seconds` ticks; returns any rest expiries they produced
    pub fn advance(&mut self, seconds: u32) -> Vec<RestExpiry> {
        (0..seconds).filter_map(|_| self.tick()).collect()
    }

    // ------------------------------------------------------------------------
    // Sets
    // ------------------------------------------------------------------------

    /// Log a performed set; arms the rest countdown unless it was the final set
    pub fn log_set(&mut self, index: usize, weight: f64, reps: i32) -> Result<SetOutcome> {
        self.ensure_active()?;
        let now = self.clock.now();
        let exercise = self.exercise_mut(index)?;
        let outcome = exercise.log_set(weight, reps)?;

        if outcome == SetOutcome::MoreRemaining {
            let rest = exercise.rest_seconds();
            self.rest.arm(rest, index, now);
            tracing::debug!("Armed {}s rest for exercise {}", rest, index);
        }
        Ok(outcome)
    }

    /// Log the planned set under the exercise's cursor as performed
    pub fn log_planned_set(&mut self, index: usize) -> Result<SetOutcome> {
        self.ensure_active()?;
        let planned = self
            .exercise_mut(index)?
            .current_planned_set()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("No planned set left to log".into()))?;
        self.log_set(index, planned.weight, planned.reps)
    }

    /// Remove the exercise's last logged set; cancels its rest countdown
    pub fn undo_set(&mut self, index: usize) -> Result<Option<LoggedSet>> {
        self.ensure_active()?;
        let undone = self.exercise_mut(index)?.undo_last_set();

        if undone.is_some() && self.rest.bound_exercise() == Some(index) {
            self.rest.cancel();
            tracing::debug!("Cancelled rest for exercise {} after undo", index);
        }
        Ok(undone)
    }

    /// End the rest early, recording the wall-clock rest on the last logged set
    ///
    /// Also serves as the "ready" action; on an expired countdown it only dismisses it.
    pub fn skip_rest(&mut self) -> Option<RestSkip> {
        let skip = self.rest.skip(self.clock.now())?;
        if let Some(exercise) = self.exercises.get_mut(skip.exercise_index) {
            exercise.record_rest(skip.actual_seconds, true);
        }
        tracing::debug!(
            "Rest skipped for exercise {} after {}s",
            skip.exercise_index,
            skip.actual_seconds
        );
        Some(skip)
    }

    pub fn acknowledge_rest(&mut self) -> bool {
        self.rest.acknowledge()
    }

    // ------------------------------------------------------------------------
    // Finish
    // ------------------------------------------------------------------------

    /// Complete the session and emit its summary
    pub fn finish(&mut self) -> Result<SessionSummary> {
        self.ensure_open()?;

        if !self.exercises.iter().any(|e| !e.completed_sets().is_empty()) {
            return Err(Error::NothingLogged);
        }

        let elapsed = self.timer.elapsed_seconds();
        let duration_minutes = u32::try_from(elapsed.div_ceil(60)).unwrap_or(u32::MAX);
        if duration_minutes == 0 {
            return Err(Error::ZeroDuration);
        }

        self.timer.stop();
        self.rest.cancel();
        self.status = SessionStatus::Completed;

        let summary = SessionSummary {
            id: Uuid::new_v4(),
            routine_id: self.routine_id.clone(),
            routine_name: self.routine_name.clone(),
            exercises: self
                .exercises
                .iter()
                .filter(|e| !e.completed_sets().is_empty())
                .map(WorkoutExercise::summary)
                .collect(),
            elapsed_seconds: elapsed,
            duration_minutes,
            started_at: self.started_at,
            finished_at: self.clock.now(),
            performed_on: self.clock.today(),
        };

        tracing::info!(
            "Finished session '{}': {} sets in {} min",
            summary.routine_name,
            summary.total_sets(),
            summary.duration_minutes
        );

        self.summary = Some(summary.clone());
        Ok(summary)
    }
}
