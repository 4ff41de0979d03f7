//! Workout definition and the phase projection function.
//!
//! A workout is `total_sets` sets; each set is one low-intensity phase
//! followed by one high-intensity phase of equal duration (or the reverse,
//! depending on the starting intensity). Everything the display or the cue
//! layer needs is derived by [`project`], a closed-form function of elapsed
//! active time. Nothing here is incremental: the same `(config, elapsed)`
//! always yields the same state, no matter how many ticks were missed in
//! between.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Phase intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    High,
}

impl Intensity {
    pub fn opposite(self) -> Self {
        match self {
            Intensity::Low => Intensity::High,
            Intensity::High => Intensity::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::High => "high",
        }
    }
}

/// Immutable workout definition.
///
/// Validated once at construction; a `WorkoutConfig` in the engine is
/// always well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutConfig {
    /// Duration of a single phase in seconds.
    pub phase_duration_secs: u64,
    /// Number of sets (one low + one high phase each).
    pub total_sets: u32,
    /// Intensity of the first phase of every set.
    pub start_intensity: Intensity,
}

impl WorkoutConfig {
    pub fn new(
        phase_duration_secs: u64,
        total_sets: u32,
        start_intensity: Intensity,
    ) -> Result<Self, ValidationError> {
        if phase_duration_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "phase_duration_secs".to_string(),
                message: "phase duration must be greater than zero".to_string(),
            });
        }
        if total_sets == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_sets".to_string(),
                message: "a workout needs at least one set".to_string(),
            });
        }
        Ok(Self {
            phase_duration_secs,
            total_sets,
            start_intensity,
        })
    }

    /// Phase duration in milliseconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn phase_duration_ms(&self) -> u64 {
        self.phase_duration_secs.saturating_mul(1000)
    }

    /// Total number of phases across the workout (two per set).
    pub fn total_phases(&self) -> u64 {
        (self.total_sets as u64).saturating_mul(2)
    }

    /// Full workout length in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.phase_duration_ms().saturating_mul(self.total_phases())
    }

    /// Intensity of the phase at `phase_index`, derived from parity.
    pub fn intensity_at(&self, phase_index: u64) -> Intensity {
        if phase_index % 2 == 0 {
            self.start_intensity
        } else {
            self.start_intensity.opposite()
        }
    }
}

/// Canonical workout state, derived from elapsed active time.
///
/// Never stored authoritatively -- always recomputed through [`project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutState {
    /// 1-based set number, clamped to `total_sets` once completed.
    pub set_index: u32,
    pub total_sets: u32,
    pub intensity: Intensity,
    /// 0-based phase index, clamped to `2 * total_sets`.
    pub phase_index: u64,
    pub phase_elapsed_ms: u64,
    pub phase_remaining_ms: u64,
    pub completed: bool,
}

impl WorkoutState {
    /// Remaining whole seconds in the current phase, rounded up.
    ///
    /// This is the display value: a running phase counts D..1 and only
    /// shows 0 at the boundary itself.
    pub fn phase_remaining_secs(&self) -> u64 {
        self.phase_remaining_ms.div_ceil(1000)
    }
}

/// Project elapsed active time onto canonical workout state.
///
/// Pure, total (defined for every `elapsed_ms`), and O(1). The closed form
/// replaces phase-by-phase catch-up loops: state cannot desync from elapsed
/// time because it is never anything but a function of it.
pub fn project(config: &WorkoutConfig, elapsed_ms: u64) -> WorkoutState {
    let d = config.phase_duration_ms();
    let max_phases = config.total_phases();
    let phase_index = (elapsed_ms / d).min(max_phases);

    if phase_index >= max_phases {
        return WorkoutState {
            set_index: config.total_sets,
            total_sets: config.total_sets,
            intensity: config.intensity_at(max_phases.saturating_sub(1)),
            phase_index: max_phases,
            phase_elapsed_ms: d,
            phase_remaining_ms: 0,
            completed: true,
        };
    }

    let phase_elapsed_ms = elapsed_ms - phase_index * d;
    WorkoutState {
        set_index: (phase_index / 2) as u32 + 1,
        total_sets: config.total_sets,
        intensity: config.intensity_at(phase_index),
        phase_index,
        phase_elapsed_ms,
        phase_remaining_ms: d - phase_elapsed_ms,
        completed: false,
    }
}
