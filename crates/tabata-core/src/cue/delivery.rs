//! At-most-once cue delivery tracking.
//!
//! Schedules are regenerated wholesale at every suspend/resume boundary, so
//! the same logical cue can be described by many descriptors over a
//! workout's lifetime. The tracker collapses them: one delivery per dedup
//! key within the tolerance window, no matter how many times the schedule
//! was rebuilt in between.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Records which logical cues have been delivered and when.
///
/// Lives for the engine's lifetime; cleared on reset.
#[derive(Debug, Clone, Default)]
pub struct CueDeliveryTracker {
    delivered: HashMap<String, DateTime<Utc>>,
}

impl CueDeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cue with this key may fire at `now`.
    ///
    /// False only when a prior delivery for the same key sits within the
    /// tolerance window; outside the window the same key may legitimately
    /// re-fire. A regressed clock reads as "within the window" and stays
    /// suppressed.
    pub fn should_deliver(&self, key: &str, now: DateTime<Utc>, tolerance_ms: u64) -> bool {
        match self.delivered.get(key) {
            Some(last) => {
                let since_ms = (now - *last).num_milliseconds();
                if since_ms < tolerance_ms as i64 {
                    tracing::debug!(key, since_ms, "suppressing duplicate cue");
                    false
                } else {
                    true
                }
            }
            None => true,
        }
    }

    pub fn record(&mut self, key: &str, now: DateTime<Utc>) {
        self.delivered.insert(key.to_string(), now);
    }

    pub fn last_delivered(&self, key: &str) -> Option<DateTime<Utc>> {
        self.delivered.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.delivered.clear();
    }
}
