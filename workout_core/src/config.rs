//! Configuration file support for Lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::clock::DEFAULT_REST_SECONDS;
use crate::{Error, Result, UnitSystem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for the override expiry check interval, in seconds
pub const MAX_EXPIRY_CHECK_SECONDS: u32 = 60;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Identity the planner and completion flag are keyed by
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,

    /// Sent with every submitted exercise
    #[serde(default)]
    pub unit_system: UnitSystem,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
            unit_system: UnitSystem::default(),
        }
    }
}

/// Defaults for exercises added during a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_rest_seconds")]
    pub default_rest_seconds: u32,

    #[serde(default = "default_set_reps")]
    pub default_set_reps: i32,

    #[serde(default)]
    pub default_set_weight: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_rest_seconds: default_rest_seconds(),
            default_set_reps: default_set_reps(),
            default_set_weight: 0.0,
        }
    }
}

/// Schedule resolver configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_expiry_check_seconds")]
    pub expiry_check_seconds: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            expiry_check_seconds: default_expiry_check_seconds(),
        }
    }
}

impl ScheduleConfig {
    /// Check interval actually used; never longer than a minute
    pub fn effective_check_interval(&self) -> u32 {
        self.expiry_check_seconds.clamp(1, MAX_EXPIRY_CHECK_SECONDS)
    }
}

// Default value functions
fn home_dir_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir_or_cwd().join(".local/share"));
    base.join("lift")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_rest_seconds() -> u32 {
    DEFAULT_REST_SECONDS
}

fn default_set_reps() -> i32 {
    10
}

fn default_expiry_check_seconds() -> u32 {
    MAX_EXPIRY_CHECK_SECONDS
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.user.id.trim().is_empty() {
            return Err(Error::Config("user.id must not be empty".into()));
        }
        if self.session.default_set_reps <= 0 {
            return Err(Error::Config(format!(
                "session.default_set_reps must be positive, got {}",
                self.session.default_set_reps
            )));
        }
        let weight = self.session.default_set_weight;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::Config(format!(
                "session.default_set_weight must be non-negative, got {}",
                weight
            )));
        }
        if self.schedule.expiry_check_seconds < 1 {
            return Err(Error::Config(
                "schedule.expiry_check_seconds must be at least 1".into(),
            ));
        }
        if self.schedule.expiry_check_seconds > MAX_EXPIRY_CHECK_SECONDS {
            tracing::warn!(
                "schedule.expiry_check_seconds = {} is above {}; clamping",
                self.schedule.expiry_check_seconds,
                MAX_EXPIRY_CHECK_SECONDS
            );
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir_or_cwd().join(".config"));
        base.join("lift").join("config.toml")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data.data_dir.join("wal").join("workouts.wal")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data.data_dir.join("workouts.csv")
    }

    pub fn routines_path(&self) -> PathBuf {
        self.data.data_dir.join("routines.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.user.id, "local");
        assert_eq!(config.session.default_rest_seconds, 120);
        assert_eq!(config.session.default_set_reps, 10);
        assert_eq!(config.schedule.expiry_check_seconds, 60);
        assert!(config.data.data_dir.ends_with("lift"));
        config.validate().unwrap();
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.user.id = "alice".into();
        config.session.default_set_weight = 20.0;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.user.id, "alice");
        assert_eq!(parsed.session.default_set_weight, 20.0);
        assert_eq!(parsed.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
default_rest_seconds = 90
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.default_rest_seconds, 90);
        assert_eq!(config.session.default_set_reps, 10); // default
        assert_eq!(config.user.id, "local");
    }

    #[test]
    fn test_validate_rejects_zero_check_interval() {
        let mut config = Config::default();
        config.schedule.expiry_check_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_set_defaults() {
        let mut config = Config::default();
        config.session.default_set_reps = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.default_set_weight = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_interval_is_clamped() {
        let mut schedule = ScheduleConfig::default();
        assert_eq!(schedule.effective_check_interval(), 60);

        schedule.expiry_check_seconds = 600;
        assert_eq!(schedule.effective_check_interval(), 60);

        schedule.expiry_check_seconds = 5;
        assert_eq!(schedule.effective_check_interval(), 5);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "[data]\ndata_dir = {:?}\n\n[user]\nid = \"bob\"\n",
                temp_dir.path().join("data")
            ),
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.user.id, "bob");
        assert_eq!(config.wal_path(), temp_dir.path().join("data/wal/workouts.wal"));
    }

    #[test]
    fn test_unit_system_setting() {
        assert_eq!(Config::default().user.unit_system, UnitSystem::Metric);

        let config: Config = toml::from_str("[user]
unit_system = \"imperial\"
").unwrap();
        assert_eq!(config.user.unit_system, UnitSystem::Imperial);
        assert_eq!(config.user.id, "local");

        assert!(toml::from_str::<Config>("[user]
unit_system = \"stone\"
").is_err());
    }
}
