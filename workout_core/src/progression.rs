//! Set progression for a single session exercise.
//!
//! Each exercise keeps its planned sets, the sets logged so far and a cursor
//! pointing at the next planned set. While planned sets remain the cursor
//! equals the number of logged sets; once they are exhausted it rests at
//! `planned_sets.len()` and the exercise is complete.

use crate::{Error, ExerciseSnapshot, ExerciseSpec, ExerciseSummary, LoggedSet, PlannedSet, Result};

/// What logging a set did to the exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// More planned sets remain; a rest period follows
    MoreRemaining,
    /// That was the last planned set
    Final,
}

/// Session-local exercise with its logged sets and set cursor
#[derive(Clone, Debug)]
pub struct WorkoutExercise {
    spec: ExerciseSpec,
    completed_sets: Vec<LoggedSet>,
    current_set_index: usize,
}

fn validate_entry(weight: f64, reps: i32) -> Result<()> {
    if reps <= 0 {
        return Err(Error::InvalidInput(format!(
            "Reps must be greater than 0 (got {})",
            reps
        )));
    }
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Weight must be a non-negative number (got {})",
            weight
        )));
    }
    Ok(())
}

impl WorkoutExercise {
    pub fn new(spec: ExerciseSpec) -> Self {
        Self {
            spec,
            completed_sets: Vec::new(),
            current_set_index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ExerciseSpec {
        &self.spec
    }

    pub fn planned_sets(&self) -> &[PlannedSet] {
        &self.spec.sets
    }

    pub fn completed_sets(&self) -> &[LoggedSet] {
        &self.completed_sets
    }

    pub fn current_set_index(&self) -> usize {
        self.current_set_index
    }

    pub fn rest_seconds(&self) -> u32 {
        self.spec.rest_seconds
    }

    pub fn set_rest_seconds(&mut self, seconds: u32) {
        self.spec.rest_seconds = seconds;
    }

    /// No planned set left to log
    pub fn is_complete(&self) -> bool {
        self.current_set_index >= self.spec.sets.len()
    }

    /// The planned set the cursor points at
    pub fn current_planned_set(&self) -> Option<&PlannedSet> {
        self.spec.sets.get(self.current_set_index)
    }

    /// Record a performed set and advance the cursor
    ///
    /// Rejected without any change if `reps <= 0`, the weight is negative, or
    /// every planned set has already been logged.
    pub fn log_set(&mut self, weight: f64, reps: i32) -> Result<SetOutcome> {
        validate_entry(weight, reps)?;
        if self.is_complete() {
            return Err(Error::InvalidInput(format!(
                "All planned sets of {} are already logged",
                self.spec.name
            )));
        }

        self.completed_sets.push(LoggedSet {
            weight,
            reps,
            rest_time_actual: None,
        });

        if self.current_set_index + 1 < self.spec.sets.len() {
            self.current_set_index += 1;
            Ok(SetOutcome::MoreRemaining)
        } else {
            self.current_set_index = self.spec.sets.len();
            Ok(SetOutcome::Final)
        }
    }

    /// Remove the most recent logged set and step the cursor back
    pub fn undo_last_set(&mut self) -> Option<LoggedSet> {
        let undone = self.completed_sets.pop()?;
        self.current_set_index = self.current_set_index.saturating_sub(1);
        Some(undone)
    }

    pub fn add_planned_set(&mut self, weight: f64, reps: i32) -> Result<()> {
        validate_entry(weight, reps)?;
        self.spec.sets.push(PlannedSet::new(weight, reps));
        Ok(())
    }

    /// Remove a planned set; the cursor is clamped to stay in bounds
    pub fn remove_planned_set(&mut self, index: usize) -> Result<PlannedSet> {
        if index >= self.spec.sets.len() {
            return Err(Error::InvalidInput(format!(
                "{} has no planned set {} ({} planned)",
                self.spec.name,
                index,
                self.spec.sets.len()
            )));
        }

        let removed = self.spec.sets.remove(index);
        self.current_set_index = self.current_set_index.min(self.spec.sets.len());
        Ok(removed)
    }

    /// Store a rest duration on the most recent logged set
    ///
    /// With `overwrite == false` an already recorded value is kept.
    /// Returns true if a value was written.
    pub fn record_rest(&mut self, seconds: u32, overwrite: bool) -> bool {
        match self.completed_sets.last_mut() {
            Some(set) if overwrite || set.rest_time_actual.is_none() => {
                set.rest_time_actual = Some(seconds);
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> ExerciseSnapshot {
        ExerciseSnapshot {
            name: self.spec.name.clone(),
            planned_sets: self.spec.sets.clone(),
            completed_sets: self.completed_sets.clone(),
            current_set_index: self.current_set_index,
            rest_seconds: self.spec.rest_seconds,
            is_complete: self.is_complete(),
        }
    }

    pub fn summary(&self) -> ExerciseSummary {
        ExerciseSummary {
            name: self.spec.name.clone(),
            rest_seconds: self.spec.rest_seconds,
            sets: self.completed_sets.clone(),
        }
    }
}
