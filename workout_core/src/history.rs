//! Workout history from the WAL and the CSV archive.
//!
//! Used by the shell to answer "has a workout already been logged today?"
//! and to list recent sessions.

use crate::csv_rollup::CsvRow;
use crate::{ExerciseSummary, LoggedSet, Result, SessionSummary};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| crate::Error::Other(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc))
}

fn parse_row_dates(row: &CsvRow) -> Result<(NaiveDate, DateTime<Utc>)> {
    let performed_on = row
        .performed_on
        .parse::<NaiveDate>()
        .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?;
    Ok((performed_on, parse_time(&row.finished_at)?))
}

/// Fold consecutive per-set rows back into session summaries
fn summaries_from_rows(rows: Vec<CsvRow>) -> Vec<SessionSummary> {
    let mut out: Vec<SessionSummary> = Vec::new();

    for row in rows {
        let id = match Uuid::parse_str(&row.id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping CSV row with invalid id {:?}: {}", row.id, e);
                continue;
            }
        };

        let set = LoggedSet {
            weight: row.weight,
            reps: row.reps,
            rest_time_actual: row.rest_seconds,
        };

        if let Some(current) = out.last_mut().filter(|s| s.id == id) {
            match current.exercises.last_mut() {
                Some(ex) if ex.name == row.exercise && row.set_number > ex.sets.len() => {
                    ex.sets.push(set);
                }
                _ => current.exercises.push(ExerciseSummary {
                    name: row.exercise,
                    rest_seconds: row.rest_setting,
                    sets: vec![set],
                }),
            }
            continue;
        }

        let (performed_on, finished_at) = match parse_row_dates(&row) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Skipping CSV row for workout {}: {}", id, e);
                continue;
            }
        };

        out.push(SessionSummary {
            id,
            routine_id: row.routine_id,
            routine_name: row.routine_name,
            exercises: vec![ExerciseSummary {
                name: row.exercise,
                rest_seconds: row.rest_setting,
                sets: vec![set],
            }],
            elapsed_seconds: row.elapsed_seconds,
            duration_minutes: row.duration_minutes,
            started_at: row.started_at.as_deref().and_then(|s| parse_time(s).ok()),
            finished_at,
            performed_on,
        });
    }

    out
}

/// Load all workouts from a CSV archive
fn load_workouts_from_csv(path: &Path) -> Result<Vec<SessionSummary>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    Ok(summaries_from_rows(rows))
}

/// Load workouts performed within the last `days` days (inclusive of `today`)
///
/// Returns workouts newest first, de-duplicated across WAL and CSV.
pub fn load_recent_workouts(
    wal_path: &Path,
    csv_path: &Path,
    today: NaiveDate,
    days: i64,
) -> Result<Vec<SessionSummary>> {
    let cutoff = today - Duration::days(days.max(1) - 1);
    let mut workouts = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for workout in crate::wal::read_workouts(wal_path)? {
            if workout.performed_on >= cutoff && seen_ids.insert(workout.id) {
                workouts.push(workout);
            }
        }
        tracing::debug!("Loaded {} workouts from WAL", workouts.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for workout in load_workouts_from_csv(csv_path)? {
            if workout.performed_on >= cutoff && seen_ids.insert(workout.id) {
                workouts.push(workout);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} workouts from CSV", csv_count);
    }

    workouts.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
    Ok(workouts)
}

/// Whether any workout was performed on `day`
pub fn logged_on(workouts: &[SessionSummary], day: NaiveDate) -> bool {
    workouts.iter().any(|w| w.performed_on == day)
}

/// The today-already-logged check
pub fn has_logged_today(wal_path: &Path, csv_path: &Path, today: NaiveDate) -> Result<bool> {
    let recent = load_recent_workouts(wal_path, csv_path, today, 1)?;
    Ok(logged_on(&recent, today))
}
