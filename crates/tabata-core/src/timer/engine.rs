//! Timer engine implementation.
//!
//! The engine is a wall-clock-based state machine composing the phase
//! projector, the cue scheduler, and the delivery tracker. It runs no
//! internal thread and reads no clock of its own -- the host supplies
//! `now` with every call and chooses the tick cadence. All derived state
//! is a pure function of elapsed active time, so any cadence (including
//! long stretches with no ticks at all) produces correct state.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed -> (reset) -> Idle
//! ```
//!
//! `Running` carries an orthogonal `suspended` flag for periods when the
//! host stops delivering regular ticks. It changes how gaps are
//! interpreted, not the Running/Paused classification: the accumulator
//! keeps counting through a suspension, it only stops across a pause.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config, CueTuning::default());
//! engine.start(now);
//! // In a loop:
//! for event in engine.tick(now) { /* forward to sinks */ }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::accumulator::ActiveTimeAccumulator;
use crate::cue::{schedule, CueDeliveryTracker, CueDescriptor, CueKind};
use crate::events::Event;
use crate::settings::CueTuning;
use crate::workout::{project, Intensity, WorkoutConfig, WorkoutState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Display values backing `StateChanged` change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DisplayLine {
    set_index: u32,
    intensity: Intensity,
    remaining_secs: u64,
    completed: bool,
}

impl DisplayLine {
    fn of(state: &WorkoutState) -> Self {
        Self {
            set_index: state.set_index,
            intensity: state.intensity,
            remaining_secs: state.phase_remaining_secs(),
            completed: state.completed,
        }
    }
}

/// Core timer engine.
///
/// Single-writer and synchronous: every method is non-blocking, performs
/// no I/O, and must be called from one logical owner. Methods return the
/// events they produced; the host forwards them to its sinks.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: WorkoutConfig,
    tuning: CueTuning,
    state: TimerState,
    suspended: bool,
    clock: ActiveTimeAccumulator,
    /// Largest elapsed value ever observed; keeps projections monotonic
    /// if the host clock slips backwards mid-run.
    high_water_ms: u64,
    pending: Vec<CueDescriptor>,
    tracker: CueDeliveryTracker,
    last_tick_at: Option<DateTime<Utc>>,
    last_display: Option<DisplayLine>,
}

impl TimerEngine {
    /// Create an idle engine. The config is validated at construction of
    /// [`WorkoutConfig`]; nothing here can fail.
    pub fn new(config: WorkoutConfig, tuning: CueTuning) -> Self {
        Self {
            config,
            tuning,
            state: TimerState::Idle,
            suspended: false,
            clock: ActiveTimeAccumulator::new(),
            high_water_ms: 0,
            pending: Vec::new(),
            tracker: CueDeliveryTracker::new(),
            last_tick_at: None,
            last_display: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> &WorkoutConfig {
        &self.config
    }

    pub fn tuning(&self) -> &CueTuning {
        &self.tuning
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Not-yet-due cue descriptors, in delivery order.
    pub fn pending_cues(&self) -> &[CueDescriptor] {
        &self.pending
    }

    /// Canonical elapsed active time at `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        self.clock.elapsed_ms(now).max(self.high_water_ms)
    }

    /// Current canonical workout state at `now`.
    pub fn workout_state(&self, now: DateTime<Utc>) -> WorkoutState {
        project(&self.config, self.elapsed_ms(now))
    }

    /// Build a full display snapshot event without mutating anything.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        state_event(&self.workout_state(now), now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != TimerState::Idle {
            return Vec::new();
        }
        self.state = TimerState::Running;
        self.suspended = false;
        self.clock.start(now);
        self.high_water_ms = 0;
        self.pending = schedule(&self.config, &self.tuning, now, 0);
        self.last_tick_at = Some(now);
        self.last_display = None;

        let mut events = vec![Event::WorkoutStarted {
            phase_duration_secs: self.config.phase_duration_secs,
            total_sets: self.config.total_sets,
            start_intensity: self.config.start_intensity,
            at: now,
        }];
        let state = project(&self.config, 0);
        events.extend(self.display_change(&state, now));
        events
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let elapsed = self.observe_elapsed(now);
        self.clock.pause(now);
        self.state = TimerState::Paused;
        // A schedule is meaningless while paused.
        self.pending.clear();
        self.last_tick_at = None;
        vec![Event::WorkoutPaused {
            elapsed_ms: elapsed,
            at: now,
        }]
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != TimerState::Paused {
            return Vec::new();
        }
        self.clock.resume(now);
        self.state = TimerState::Running;
        let elapsed = self.observe_elapsed(now);
        self.pending = schedule(&self.config, &self.tuning, now, elapsed);
        self.last_tick_at = Some(now);
        self.last_display = None;

        let mut events = vec![Event::WorkoutResumed {
            elapsed_ms: elapsed,
            at: now,
        }];
        let state = project(&self.config, elapsed);
        events.extend(self.display_change(&state, now));
        events
    }

    /// Call periodically while running. Drives display updates, cue
    /// delivery, and the transition into `Completed`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let gap_ms = self
            .last_tick_at
            .map(|last| (now - last).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        self.last_tick_at = Some(now);
        let elapsed = self.observe_elapsed(now);
        let state = project(&self.config, elapsed);

        let mut events = Vec::new();
        events.extend(self.display_change(&state, now));
        events.extend(self.drain_due(now, elapsed));

        if state.completed {
            self.state = TimerState::Completed;
            self.suspended = false;
            events.extend(self.completion_cue(now));
            self.pending.clear();
            return events;
        }

        if gap_ms >= self.tuning.brief_interruption_threshold_ms() {
            // The host was away long enough that the reference bookkeeping
            // is stale; the projected state needs no catch-up.
            tracing::debug!(gap_ms, "tick gap above brief-interruption threshold; refreshing schedule");
            self.pending = schedule(&self.config, &self.tuning, now, elapsed);
        }
        events
    }

    /// The host is about to stop delivering regular ticks. Elapsed time
    /// keeps advancing; the remaining schedule is regenerated once so the
    /// host can act on it (or drain it at resume).
    pub fn on_suspend(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        self.suspended = true;
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let elapsed = self.observe_elapsed(now);
        self.pending = schedule(&self.config, &self.tuning, now, elapsed);
        Vec::new()
    }

    /// Regular ticks are back. State is projected directly from elapsed
    /// time -- no catch-up loop -- and cues that came due during the
    /// suspension are delivered with stale ones coalesced away.
    pub fn on_resume(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        self.suspended = false;
        if self.state != TimerState::Running {
            return Vec::new();
        }
        self.last_tick_at = Some(now);
        let elapsed = self.observe_elapsed(now);
        let state = project(&self.config, elapsed);

        let mut events = Vec::new();
        events.extend(self.display_change(&state, now));
        events.extend(self.drain_due(now, elapsed));

        if state.completed {
            self.state = TimerState::Completed;
            events.extend(self.completion_cue(now));
            self.pending.clear();
        } else {
            self.pending = schedule(&self.config, &self.tuning, now, elapsed);
        }
        events
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        self.clear_all();
        vec![Event::WorkoutStopped { at: now }]
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        self.clear_all();
        vec![Event::WorkoutReset { at: now }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn clear_all(&mut self) {
        self.state = TimerState::Idle;
        self.suspended = false;
        self.clock.reset();
        self.high_water_ms = 0;
        self.pending.clear();
        self.tracker.clear();
        self.last_tick_at = None;
        self.last_display = None;
    }

    /// Observe elapsed time, never letting it move backwards.
    fn observe_elapsed(&mut self, now: DateTime<Utc>) -> u64 {
        let raw = self.clock.elapsed_ms(now);
        if raw < self.high_water_ms {
            tracing::warn!(
                raw_ms = raw,
                high_water_ms = self.high_water_ms,
                "elapsed time regressed; holding at high water mark"
            );
        } else {
            self.high_water_ms = raw;
        }
        self.high_water_ms
    }

    fn display_change(&mut self, state: &WorkoutState, now: DateTime<Utc>) -> Option<Event> {
        let line = DisplayLine::of(state);
        if self.last_display == Some(line) {
            return None;
        }
        self.last_display = Some(line);
        Some(state_event(state, now))
    }

    /// Deliver every pending cue whose due time has passed.
    ///
    /// Stale transition warnings (their boundary already crossed) are
    /// dropped; of several due set announcements only the most recent is
    /// dispatched, its payload and dedup key re-derived from live state.
    /// Stacking stale audio on a resume is worse than dropping it.
    fn drain_due(&mut self, now: DateTime<Utc>, live_elapsed_ms: u64) -> Vec<Event> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let mut due: Vec<CueDescriptor> = Vec::new();
        self.pending.retain(|c| {
            if c.due_at <= now {
                due.push(*c);
                false
            } else {
                true
            }
        });
        if due.is_empty() {
            return Vec::new();
        }
        due.sort_by(|a, b| {
            a.due_at
                .cmp(&b.due_at)
                .then(b.kind.priority().cmp(&a.kind.priority()))
                .then(a.boundary_phase.cmp(&b.boundary_phase))
        });

        let live = project(&self.config, live_elapsed_ms);
        let newest_set_boundary = due
            .iter()
            .filter(|c| matches!(c.kind, CueKind::SetCompletionWarning { .. }))
            .map(|c| c.boundary_phase)
            .max();

        let mut events = Vec::new();
        for desc in due {
            match desc.kind {
                CueKind::PhaseTransitionWarning => {
                    if desc.boundary_elapsed_ms <= live_elapsed_ms {
                        tracing::debug!(
                            boundary = desc.boundary_phase,
                            "dropping transition warning for a boundary that already passed"
                        );
                        continue;
                    }
                    events.extend(self.fire(desc.kind, desc.boundary_phase, &live, now));
                }
                CueKind::SetCompletionWarning { .. } => {
                    if Some(desc.boundary_phase) != newest_set_boundary {
                        tracing::debug!(
                            boundary = desc.boundary_phase,
                            "dropping stale set announcement"
                        );
                        continue;
                    }
                    // Payload and key reflect where the workout is NOW,
                    // not where it was when this descriptor was generated.
                    let kind = CueKind::SetCompletionWarning {
                        set_index: live.set_index,
                    };
                    events.extend(self.fire(kind, desc.boundary_phase, &live, now));
                }
                CueKind::WorkoutComplete => {
                    events.extend(self.fire(desc.kind, desc.boundary_phase, &live, now));
                }
            }
        }
        events
    }

    fn fire(
        &mut self,
        kind: CueKind,
        boundary_phase: u64,
        live: &WorkoutState,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let key = kind.dedup_key(boundary_phase);
        let allowed = match kind {
            // The completion notice fires exactly once per workout, ever.
            CueKind::WorkoutComplete => {
                let first = self.tracker.last_delivered(&key).is_none();
                if !first {
                    tracing::debug!("suppressing repeat completion notice");
                }
                first
            }
            // The final set has no later opportunity; never suppress it.
            CueKind::SetCompletionWarning { set_index }
                if set_index == self.config.total_sets =>
            {
                true
            }
            _ => self
                .tracker
                .should_deliver(&key, now, self.tuning.delivery_tolerance_ms()),
        };
        if !allowed {
            return None;
        }
        self.tracker.record(&key, now);
        Some(Event::CueFired {
            cue: kind,
            text: self.cue_text(&kind, live),
            at: now,
        })
    }

    /// The completion notice for paths where its descriptor never came up
    /// for delivery (prolonged tick starvation straight past the end).
    fn completion_cue(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let key = CueKind::WorkoutComplete.dedup_key(self.config.total_phases());
        if self.tracker.last_delivered(&key).is_some() {
            return None;
        }
        self.tracker.record(&key, now);
        Some(Event::CueFired {
            cue: CueKind::WorkoutComplete,
            text: "Workout complete".to_string(),
            at: now,
        })
    }

    fn cue_text(&self, kind: &CueKind, live: &WorkoutState) -> String {
        match kind {
            CueKind::PhaseTransitionWarning => format!(
                "Switch to {} intensity coming up",
                live.intensity.opposite().label()
            ),
            CueKind::SetCompletionWarning { set_index } => format!(
                "Set {} of {} almost done",
                set_index, self.config.total_sets
            ),
            CueKind::WorkoutComplete => "Workout complete".to_string(),
        }
    }
}

fn state_event(state: &WorkoutState, now: DateTime<Utc>) -> Event {
    Event::StateChanged {
        set_index: state.set_index,
        total_sets: state.total_sets,
        intensity: state.intensity,
        phase_remaining_ms: state.phase_remaining_ms,
        phase_elapsed_ms: state.phase_elapsed_ms,
        completed: state.completed,
        at: now,
    }
}
