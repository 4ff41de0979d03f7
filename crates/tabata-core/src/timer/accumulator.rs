//! Active-time accumulation across pause/resume boundaries.
//!
//! The accumulator is the only time bookkeeping in the engine: the sum of
//! prior active run lengths, plus the current run segment when running.
//! Everything else is projected from the elapsed total, so missed ticks
//! cannot desync anything -- there is no per-tick decrement to miss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActiveTimeAccumulator {
    /// Timestamp of the last start/resume; `None` while not running.
    epoch_start: Option<DateTime<Utc>>,
    /// Sum of completed run segments in milliseconds.
    accumulated_ms: u64,
}

impl ActiveTimeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(&self) -> bool {
        self.epoch_start.is_some()
    }

    /// Begin a fresh accumulation at `now`, discarding any prior total.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.accumulated_ms = 0;
        self.epoch_start = Some(now);
    }

    /// Fold the current run segment into the total and stop.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.epoch_start.take() {
            self.accumulated_ms = self.accumulated_ms.saturating_add(delta_ms(start, now));
        }
    }

    /// Open a new run segment at `now`. No-op while already running.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.epoch_start.is_none() {
            self.epoch_start = Some(now);
        }
    }

    /// Canonical elapsed active time at `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let current = self
            .epoch_start
            .map(|start| delta_ms(start, now))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(current)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn delta_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let ms = (to - from).num_milliseconds();
    if ms < 0 {
        tracing::warn!(delta_ms = ms, "clock moved backwards; clamping to zero");
        0
    } else {
        ms as u64
    }
}
