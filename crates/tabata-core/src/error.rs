//! Core error types for tabata-core.
//!
//! Errors only occur at the edges: validating a workout definition and
//! reading/writing the TOML settings file. The running engine never fails;
//! anomalies (late ticks, clock jumps, stale schedules) degrade through
//! deterministic fallback rules instead of surfacing here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tabata-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
///
/// Raised once, at construction; a validated [`crate::workout::WorkoutConfig`]
/// never reaches the engine in an invalid state.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
