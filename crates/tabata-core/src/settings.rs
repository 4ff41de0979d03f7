//! TOML-based application configuration.
//!
//! Stores the workout defaults the CLI starts from and the cue timing
//! tunables. The lead and tolerance values were tuned per interval length
//! in practice, so they are configuration rather than constants.
//!
//! Configuration is stored at `~/.config/tabata/config.toml`.
//! Set `TABATA_ENV=dev` to use a separate development directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, ValidationError};
use crate::workout::{Intensity, WorkoutConfig};

/// Default workout definition used when the CLI is run without flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSettings {
    #[serde(default = "default_phase_duration")]
    pub phase_duration_secs: u64,
    #[serde(default = "default_total_sets")]
    pub total_sets: u32,
    #[serde(default = "default_start_intensity")]
    pub start_intensity: Intensity,
}

impl WorkoutSettings {
    pub fn to_config(&self) -> Result<WorkoutConfig, ValidationError> {
        WorkoutConfig::new(self.phase_duration_secs, self.total_sets, self.start_intensity)
    }
}

impl Default for WorkoutSettings {
    fn default() -> Self {
        Self {
            phase_duration_secs: default_phase_duration(),
            total_sets: default_total_sets(),
            start_intensity: default_start_intensity(),
        }
    }
}

/// Cue timing tunables.
///
/// Leads are how far ahead of their boundary cues fire; the tolerance is
/// both the duplicate-suppression window and the coalescing distance for
/// neighboring cues. Proportion them to the phase length: a 10s tolerance
/// against 10s phases deliberately coalesces transition warnings into the
/// neighboring set announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueTuning {
    #[serde(default = "default_warning_lead")]
    pub warning_lead_secs: u64,
    #[serde(default = "default_set_completion_lead")]
    pub set_completion_lead_secs: u64,
    /// Small positive lead so a final spoken announcement can finish
    /// before the completion notice lands.
    #[serde(default = "default_workout_complete_lead")]
    pub workout_complete_lead_secs: u64,
    #[serde(default = "default_brief_interruption_threshold")]
    pub brief_interruption_threshold_secs: u64,
    #[serde(default = "default_delivery_tolerance")]
    pub delivery_tolerance_secs: u64,
}

impl CueTuning {
    pub fn warning_lead_ms(&self) -> u64 {
        self.warning_lead_secs.saturating_mul(1000)
    }

    pub fn set_completion_lead_ms(&self) -> u64 {
        self.set_completion_lead_secs.saturating_mul(1000)
    }

    pub fn workout_complete_lead_ms(&self) -> u64 {
        self.workout_complete_lead_secs.saturating_mul(1000)
    }

    pub fn brief_interruption_threshold_ms(&self) -> u64 {
        self.brief_interruption_threshold_secs.saturating_mul(1000)
    }

    pub fn delivery_tolerance_ms(&self) -> u64 {
        self.delivery_tolerance_secs.saturating_mul(1000)
    }
}

impl Default for CueTuning {
    fn default() -> Self {
        Self {
            warning_lead_secs: default_warning_lead(),
            set_completion_lead_secs: default_set_completion_lead(),
            workout_complete_lead_secs: default_workout_complete_lead(),
            brief_interruption_threshold_secs: default_brief_interruption_threshold(),
            delivery_tolerance_secs: default_delivery_tolerance(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/tabata/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub workout: WorkoutSettings,
    #[serde(default)]
    pub cues: CueTuning,
}

impl Settings {
    /// Load settings from disk, falling back to defaults when no config
    /// file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }
}

/// Returns `~/.config/tabata[-dev]/` based on TABATA_ENV.
///
/// Set TABATA_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TABATA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("tabata-dev")
    } else {
        base_dir.join("tabata")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

fn default_phase_duration() -> u64 {
    60
}

fn default_total_sets() -> u32 {
    8
}

fn default_start_intensity() -> Intensity {
    Intensity::Low
}

fn default_warning_lead() -> u64 {
    3
}

fn default_set_completion_lead() -> u64 {
    5
}

fn default_workout_complete_lead() -> u64 {
    1
}

fn default_brief_interruption_threshold() -> u64 {
    3
}

fn default_delivery_tolerance() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let settings = Settings::default();
        assert!(settings.workout.to_config().is_ok());
        assert_eq!(settings.cues.delivery_tolerance_secs, 10);
    }

    #[test]
    fn empty_toml_fills_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.workout.phase_duration_secs, 60);
        assert_eq!(settings.cues.warning_lead_secs, 3);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [cues]
            delivery_tolerance_secs = 4
            "#,
        )
        .unwrap();
        assert_eq!(settings.cues.delivery_tolerance_secs, 4);
        assert_eq!(settings.cues.set_completion_lead_secs, 5);
        assert_eq!(settings.workout.total_sets, 8);
    }

    #[test]
    fn toml_round_trip() {
        let settings = Settings::default();
        let raw = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&raw).unwrap();
        assert_eq!(back.workout.phase_duration_secs, settings.workout.phase_duration_secs);
        assert_eq!(back.cues.warning_lead_secs, settings.cues.warning_lead_secs);
    }

    #[test]
    fn ms_helpers_scale_seconds() {
        let tuning = CueTuning::default();
        assert_eq!(tuning.warning_lead_ms(), 3_000);
        assert_eq!(tuning.delivery_tolerance_ms(), 10_000);
    }
}
