//! Write-Ahead Log (WAL) for finished workouts.
//!
//! Completed session summaries are appended to a JSONL (JSON Lines) file with
//! file locking to ensure safe concurrent access.

use crate::{Result, SessionSummary};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for finished sessions (the finish-submission collaborator)
pub trait WorkoutSink {
    fn append(&mut self, summary: &SessionSummary) -> Result<()>;
}

/// JSONL-based workout sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl WorkoutSink for JsonlSink {
    fn append(&mut self, summary: &SessionSummary) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(summary)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended workout {} to WAL", summary.id);
        Ok(())
    }
}

/// Read all workouts from a WAL file
///
/// Lines that fail to parse are logged and skipped.
pub fn read_workouts(path: &Path) -> Result<Vec<SessionSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut workouts = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionSummary>(&line) {
            Ok(summary) => workouts.push(summary),
            Err(e) => {
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from WAL", workouts.len());
    Ok(workouts)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{ExerciseSummary, LoggedSet, SessionSummary};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    /// A finished two-set workout on the given day
    pub fn summary_on(name: &str, day: NaiveDate) -> SessionSummary {
        let finished_at = Utc.from_utc_datetime(&day.and_hms_opt(19, 0, 0).unwrap());
        SessionSummary {
            id: Uuid::new_v4(),
            routine_id: Some("r1".into()),
            routine_name: name.into(),
            exercises: vec![ExerciseSummary {
                name: "Squat".into(),
                rest_seconds: 120,
                sets: vec![
                    LoggedSet {
                        weight: 100.0,
                        reps: 5,
                        rest_time_actual: Some(95),
                    },
                    LoggedSet {
                        weight: 100.0,
                        reps: 5,
                        rest_time_actual: None,
                    },
                ],
            }],
            elapsed_seconds: 1500,
            duration_minutes: 25,
            started_at: Some(finished_at - Duration::seconds(1500)),
            finished_at,
            performed_on: day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::summary_on;
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_append_and_read_single_workout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let summary = summary_on("Leg Day", day());
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&summary).unwrap();

        let workouts = read_workouts(&wal_path).unwrap();
        assert_eq!(workouts, vec![summary]);
    }

    #[test]
    fn test_append_multiple_workouts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("nested/dir/test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        for _ in 0..5 {
            sink.append(&summary_on("Leg Day", day())).unwrap();
        }

        assert_eq!(read_workouts(&wal_path).unwrap().len(), 5);
    }

    #[test]
    fn test_read_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("nonexistent.wal");

        assert!(read_workouts(&wal_path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&summary_on("Leg Day", day())).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
            file.write_all(b"{ not json }\n\n").unwrap();
        }
        sink.append(&summary_on("Push Day", day())).unwrap();

        let workouts = read_workouts(&wal_path).unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[1].routine_name, "Push Day");
    }
}
