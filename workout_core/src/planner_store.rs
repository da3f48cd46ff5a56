//! Persistence of the weekly schedule and the same-day override.
//!
//! The engine only talks to the narrow [`PlannerStore`] interface. The file
//! store keeps one JSON document per user with proper file locking so two
//! processes never interleave writes.

use crate::{Error, Result, TemporaryOverride, WeeklySchedule};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Read/write access to a user's schedule and override
pub trait PlannerStore {
    fn load_schedule(&self) -> Result<WeeklySchedule>;
    fn save_schedule(&mut self, schedule: &WeeklySchedule) -> Result<()>;
    fn load_override(&self) -> Result<Option<TemporaryOverride>>;
    fn save_override(&mut self, override_: Option<&TemporaryOverride>) -> Result<()>;
}

/// On-disk document
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlannerState {
    #[serde(default)]
    pub weekly_schedule: WeeklySchedule,
    #[serde(default)]
    pub temporary_override: Option<TemporaryOverride>,
}

impl PlannerState {
    /// Load planner state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No planner file at {:?}, using empty schedule", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open planner file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock planner file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read planner file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<PlannerState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse planner file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save planner state with exclusive locking and an atomic rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("Planner path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved planner state to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut PlannerState),
    {
        let mut state = Self::load(path)?;
        f(&mut state);
        state.save(path)?;
        Ok(state)
    }
}

/// File-name-safe form of a user id
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte becomes
/// `%XX`. Distinct ids always map to distinct names and never leave the
/// target directory.
pub fn user_file_stem(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Per-user JSON file under `<data_dir>/planner/`
#[derive(Clone, Debug)]
pub struct FilePlannerStore {
    path: PathBuf,
}

impl FilePlannerStore {
    pub fn new(data_dir: &Path, user_id: &str) -> Self {
        Self {
            path: data_dir
                .join("planner")
                .join(format!("{}.json", user_file_stem(user_id))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlannerStore for FilePlannerStore {
    fn load_schedule(&self) -> Result<WeeklySchedule> {
        Ok(PlannerState::load(&self.path)?.weekly_schedule)
    }

    fn save_schedule(&mut self, schedule: &WeeklySchedule) -> Result<()> {
        PlannerState::update(&self.path, |state| {
            state.weekly_schedule = schedule.clone();
        })?;
        Ok(())
    }

    fn load_override(&self) -> Result<Option<TemporaryOverride>> {
        Ok(PlannerState::load(&self.path)?.temporary_override)
    }

    fn save_override(&mut self, override_: Option<&TemporaryOverride>) -> Result<()> {
        PlannerState::update(&self.path, |state| {
            state.temporary_override = override_.cloned();
        })?;
        Ok(())
    }
}

/// In-memory store for embedding hosts and tests
#[derive(Clone, Debug, Default)]
pub struct MemoryPlannerStore {
    state: PlannerState,
}

impl PlannerStore for MemoryPlannerStore {
    fn load_schedule(&self) -> Result<WeeklySchedule> {
        Ok(self.state.weekly_schedule.clone())
    }

    fn save_schedule(&mut self, schedule: &WeeklySchedule) -> Result<()> {
        self.state.weekly_schedule = schedule.clone();
        Ok(())
    }

    fn load_override(&self) -> Result<Option<TemporaryOverride>> {
        Ok(self.state.temporary_override.clone())
    }

    fn save_override(&mut self, override_: Option<&TemporaryOverride>) -> Result<()> {
        self.state.temporary_override = override_.cloned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn sample_override() -> TemporaryOverride {
        TemporaryOverride {
            routine_id: "R2".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        }
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FilePlannerStore::new(temp_dir.path(), "user-1");

        let mut schedule = WeeklySchedule::new();
        schedule.set(Weekday::Tue, "R1");
        store.save_schedule(&schedule).unwrap();
        store.save_override(Some(&sample_override())).unwrap();

        let reopened = FilePlannerStore::new(temp_dir.path(), "user-1");
        assert_eq!(reopened.load_schedule().unwrap(), schedule);
        assert_eq!(reopened.load_override().unwrap(), Some(sample_override()));
    }

    #[test]
    fn test_override_write_keeps_schedule() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FilePlannerStore::new(temp_dir.path(), "local");

        let mut schedule = WeeklySchedule::new();
        schedule.set(Weekday::Mon, "legs");
        store.save_schedule(&schedule).unwrap();
        store.save_override(Some(&sample_override())).unwrap();
        store.save_override(None).unwrap();

        assert_eq!(store.load_schedule().unwrap(), schedule);
        assert_eq!(store.load_override().unwrap(), None);
    }

    #[test]
    fn test_users_are_kept_apart() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut alice = FilePlannerStore::new(temp_dir.path(), "alice");
        let bob = FilePlannerStore::new(temp_dir.path(), "bob");

        alice.save_override(Some(&sample_override())).unwrap();
        assert!(bob.load_override().unwrap().is_none());
    }

    #[test]
    fn test_user_id_is_encoded_for_file_name() {
        let store = FilePlannerStore::new(Path::new("/data"), "../evil/id");
        assert_eq!(store.path(), Path::new("/data/planner/%2E%2E%2Fevil%2Fid.json"));
        assert_eq!(user_file_stem("local"), "local");
        assert_eq!(user_file_stem("50%"), "50%25");
    }

    #[test]
    fn test_similar_user_ids_get_separate_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dotted = FilePlannerStore::new(temp_dir.path(), "alice.smith");
        let underscored = FilePlannerStore::new(temp_dir.path(), "alice_smith");
        assert_ne!(dotted.path(), underscored.path());

        dotted.save_override(Some(&sample_override())).unwrap();
        assert!(underscored.load_override().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_gives_empty_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePlannerStore::new(temp_dir.path(), "nobody");
        assert_eq!(store.load_schedule().unwrap(), WeeklySchedule::new());
        assert!(store.load_override().unwrap().is_none());
    }

    #[test]
    fn test_corrupted_file_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FilePlannerStore::new(temp_dir.path(), "local");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ invalid json }").unwrap();

        assert_eq!(store.load_schedule().unwrap(), WeeklySchedule::new());
        assert!(store.load_override().unwrap().is_none());
    }

    #[test]
    fn test_document_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FilePlannerStore::new(temp_dir.path(), "local");
        store.save_override(Some(&sample_override())).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["temporaryOverride"]["routineId"], "R2");
        assert_eq!(value["temporaryOverride"]["date"], "2024-03-05");
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FilePlannerStore::new(temp_dir.path(), "local");
        store.save_schedule(&WeeklySchedule::new()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path().join("planner"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "local.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only local.json, found extras: {:?}",
            extras
        );
    }
}
