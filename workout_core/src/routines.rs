//! Routine library: the templates a session can be opened from.
//!
//! Routines are read from `<data_dir>/routines.json`. When that file is
//! missing, a small built-in library is used instead.

use crate::clock::DEFAULT_REST_SECONDS;
use crate::config::SessionConfig;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Cached built-in routines
static DEFAULT_ROUTINES: Lazy<RoutineBook> = Lazy::new(build_default_routines);

/// Get a reference to the cached built-in routine library
pub fn get_default_routines() -> &'static RoutineBook {
    &DEFAULT_ROUTINES
}

fn exercise(id: &str, name: &str, target: &str, sets: &[(f64, i32)], rest_seconds: u32) -> ExerciseSpec {
    ExerciseSpec {
        id: id.into(),
        name: name.into(),
        target: Some(target.into()),
        sets: sets.iter().map(|&(w, r)| PlannedSet::new(w, r)).collect(),
        rest_seconds,
    }
}

fn build_default_routines() -> RoutineBook {
    RoutineBook {
        routines: vec![
            Routine {
                id: "push".into(),
                name: "Push Day".into(),
                exercises: vec![
                    exercise("bench_press", "Bench Press", "chest", &[(60.0, 8); 3], 120),
                    exercise("overhead_press", "Overhead Press", "shoulders", &[(40.0, 8); 3], 120),
                    exercise("triceps_pushdown", "Triceps Pushdown", "triceps", &[(20.0, 12); 3], 60),
                ],
                notes: None,
            },
            Routine {
                id: "pull".into(),
                name: "Pull Day".into(),
                exercises: vec![
                    exercise("deadlift", "Deadlift", "back", &[(100.0, 5); 3], 180),
                    exercise("barbell_row", "Barbell Row", "back", &[(60.0, 8); 3], 120),
                    exercise("biceps_curl", "Biceps Curl", "biceps", &[(12.0, 12); 3], 60),
                ],
                notes: None,
            },
            Routine {
                id: "legs".into(),
                name: "Leg Day".into(),
                exercises: vec![
                    exercise("back_squat", "Back Squat", "quads", &[(80.0, 5); 5], DEFAULT_REST_SECONDS),
                    exercise("romanian_deadlift", "Romanian Deadlift", "hamstrings", &[(60.0, 10); 3], 90),
                    exercise("calf_raise", "Calf Raise", "calves", &[(0.0, 15); 3], 60),
                ],
                notes: Some("Warm up with two light squat sets first.".into()),
            },
        ],
    }
}

/// A set of routines, as stored in `routines.json`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RoutineBook {
    pub routines: Vec<Routine>,
}

impl RoutineBook {
    /// Load the library from `path`, falling back to the built-in routines
    /// when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No routine file at {:?}, using built-in routines", path);
            return Ok(get_default_routines().clone());
        }

        let contents = std::fs::read_to_string(path)?;
        let book: RoutineBook = serde_json::from_str(&contents)?;

        let problems = book.validate();
        if !problems.is_empty() {
            return Err(Error::Routine(problems.join("; ")));
        }

        tracing::info!("Loaded {} routines from {:?}", book.routines.len(), path);
        Ok(book)
    }

    pub fn get(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.id == id)
    }

    /// Look up a routine, failing with a routine error when it is unknown
    pub fn require(&self, id: &str) -> Result<&Routine> {
        self.get(id)
            .ok_or_else(|| Error::Routine(format!("Unknown routine: {}", id)))
    }

    /// Check the library for problems; an empty list means it is usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for routine in &self.routines {
            if routine.id.trim().is_empty() {
                errors.push(format!("Routine '{}' has an empty id", routine.name));
            } else if !seen.insert(routine.id.as_str()) {
                errors.push(format!("Duplicate routine id: {}", routine.id));
            }
            if routine.name.trim().is_empty() {
                errors.push(format!("Routine {} has an empty name", routine.id));
            }

            for ex in &routine.exercises {
                if ex.name.trim().is_empty() {
                    errors.push(format!("Routine {} has an unnamed exercise", routine.id));
                }
                for (i, set) in ex.sets.iter().enumerate() {
                    if set.reps <= 0 {
                        errors.push(format!(
                            "Routine {} exercise '{}' set {} has non-positive reps",
                            routine.id,
                            ex.name,
                            i + 1
                        ));
                    }
                    if !set.weight.is_finite() || set.weight < 0.0 {
                        errors.push(format!(
                            "Routine {} exercise '{}' set {} has a negative weight",
                            routine.id,
                            ex.name,
                            i + 1
                        ));
                    }
                }
            }
        }

        errors
    }
}

/// Build an exercise added by name during a session, with one default set
pub fn ad_hoc_exercise(name: &str, defaults: &SessionConfig) -> ExerciseSpec {
    let id = name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    ExerciseSpec {
        id,
        name: name.trim().into(),
        target: None,
        sets: vec![PlannedSet::new(
            defaults.default_set_weight,
            defaults.default_set_reps,
        )],
        rest_seconds: defaults.default_rest_seconds,
    }
}
