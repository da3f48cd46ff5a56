//! CSV rollup functionality for archiving WAL workouts.
//!
//! Each logged set becomes one CSV row, so the archive opens cleanly in a
//! spreadsheet. The conversion is ordered to prevent data loss.

use crate::{Result, SessionSummary};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive (one logged set)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub id: String,
    pub routine_id: Option<String>,
    pub routine_name: String,
    pub performed_on: String,
    pub started_at: Option<String>,
    pub finished_at: String,
    pub elapsed_seconds: u64,
    pub duration_minutes: u32,
    pub exercise: String,
    pub rest_setting: u32,
    pub set_number: usize,
    pub weight: f64,
    pub reps: i32,
    pub rest_seconds: Option<u32>,
}

fn rows_for(summary: &SessionSummary) -> Vec<CsvRow> {
    let mut rows = Vec::with_capacity(summary.total_sets());
    for exercise in &summary.exercises {
        for (i, set) in exercise.sets.iter().enumerate() {
            rows.push(CsvRow {
                id: summary.id.to_string(),
                routine_id: summary.routine_id.clone(),
                routine_name: summary.routine_name.clone(),
                performed_on: summary.performed_on.to_string(),
                started_at: summary.started_at.map(|t| t.to_rfc3339()),
                finished_at: summary.finished_at.to_rfc3339(),
                elapsed_seconds: summary.elapsed_seconds,
                duration_minutes: summary.duration_minutes,
                exercise: exercise.name.clone(),
                rest_setting: exercise.rest_seconds,
                set_number: i + 1,
                weight: set.weight,
                reps: set.reps,
                rest_seconds: set.rest_time_actual,
            });
        }
    }
    rows
}

/// Roll up WAL workouts into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all workouts from the WAL
/// 2. Appends one row per logged set to the CSV file (headers on first write)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of workouts processed
///
/// The WAL is renamed, not deleted, so it can be recovered by hand.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let workouts = crate::wal::read_workouts(wal_path)?;

    if workouts.is_empty() {
        tracing::info!("No workouts in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for workout in &workouts {
        for row in rows_for(workout) {
            writer.serialize(row)?;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} workouts to CSV", workouts.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(workouts.len())
}

/// Remove all `.processed` WAL files in `dir`
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
