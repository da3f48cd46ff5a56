//! Error types for the workout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A set or planned-set entry was rejected (non-positive reps, negative weight, bad index)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tried to start a session that has no exercises
    #[error("Cannot start a session with no exercises")]
    EmptySession,

    /// Tried to finish a session without any completed sets
    #[error("Cannot finish a session with no logged sets")]
    NothingLogged,

    /// Tried to finish a session before the timer ever ticked
    #[error("Cannot finish a session with zero elapsed time")]
    ZeroDuration,

    /// The external finish submission failed; the completed session is kept for retry
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Command not accepted in the current session state
    #[error("State error: {0}")]
    State(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Routine library validation error
    #[error("Routine error: {0}")]
    Routine(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
