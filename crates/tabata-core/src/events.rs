//! Engine output events.
//!
//! Every observable change produces an [`Event`]. The host polls the engine
//! and forwards events to its own sinks: `StateChanged` drives whatever
//! display exists, `CueFired` maps to audio playback, local notifications,
//! or haptics. The core never performs that dispatch itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cue::CueKind;
use crate::workout::Intensity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    WorkoutStarted {
        phase_duration_secs: u64,
        total_sets: u32,
        start_intensity: Intensity,
        at: DateTime<Utc>,
    },
    WorkoutPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    WorkoutResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    WorkoutStopped {
        at: DateTime<Utc>,
    },
    WorkoutReset {
        at: DateTime<Utc>,
    },
    /// Display values changed. Emitted at most once per distinct display
    /// state; the millisecond fields are exact.
    StateChanged {
        set_index: u32,
        total_sets: u32,
        intensity: Intensity,
        phase_remaining_ms: u64,
        phase_elapsed_ms: u64,
        completed: bool,
        at: DateTime<Utc>,
    },
    /// A cue came due and passed duplicate suppression. The payload text is
    /// rendered from live state at delivery time.
    CueFired {
        cue: CueKind,
        text: String,
        at: DateTime<Utc>,
    },
}
