//! Cue schedule generation.
//!
//! The schedule is always regenerated wholesale from the current time
//! reference -- callers discard the previous list instead of patching it.
//! Incremental patching is where "a set's warning silently skipped" bugs
//! live; a pure regeneration from `(config, tuning, reference)` cannot
//! drift from the workout timeline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::CueTuning;
use crate::workout::WorkoutConfig;

/// The kind of a scheduled cue.
///
/// Two priority classes: set announcements and the completion notice
/// outrank phase-transition warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum CueKind {
    /// A phase switch inside a set is coming up.
    PhaseTransitionWarning,
    /// A set boundary is coming up.
    SetCompletionWarning { set_index: u32 },
    /// The workout is about to end.
    WorkoutComplete,
}

impl CueKind {
    pub fn priority(self) -> u8 {
        match self {
            CueKind::PhaseTransitionWarning => 0,
            CueKind::SetCompletionWarning { .. } | CueKind::WorkoutComplete => 1,
        }
    }

    /// Logical identity used for at-most-once delivery.
    ///
    /// Set announcements key on the set number so that a re-generated
    /// schedule (or a late delivery re-derived from live state) still
    /// refers to the same logical cue.
    pub fn dedup_key(&self, boundary_phase: u64) -> String {
        match self {
            CueKind::PhaseTransitionWarning => format!("transition:{boundary_phase}"),
            CueKind::SetCompletionWarning { set_index } => format!("set-complete:{set_index}"),
            CueKind::WorkoutComplete => "workout-complete".to_string(),
        }
    }
}

/// One scheduled cue.
///
/// Stores the cue kind and its ordering keys only. The announcement payload
/// (and, for set announcements, the dedup key) is re-derived from live
/// state at delivery time -- the workout may have advanced past whatever
/// this descriptor assumed when it was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueDescriptor {
    pub kind: CueKind,
    /// 1-based phase boundary this cue belongs to; boundary `k` sits at
    /// elapsed `k * phase_duration`.
    pub boundary_phase: u64,
    /// Elapsed active time at the boundary, in milliseconds.
    pub boundary_elapsed_ms: u64,
    /// How far ahead of the boundary the cue fires.
    pub lead_ms: u64,
    /// Absolute wall-clock due time.
    pub due_at: DateTime<Utc>,
}

/// Generate the ordered list of remaining cues.
///
/// `elapsed_at_reference_ms` is the workout's elapsed active time at
/// `reference_now`. One cue per remaining boundary (two at the final one),
/// future-due only; already-due cues had their chance under the previous
/// schedule. Deterministic: identical inputs produce the identical list.
pub fn schedule(
    config: &WorkoutConfig,
    tuning: &CueTuning,
    reference_now: DateTime<Utc>,
    elapsed_at_reference_ms: u64,
) -> Vec<CueDescriptor> {
    let d = config.phase_duration_ms();
    let max_phases = config.total_phases();
    let mut cues = Vec::new();

    for k in 1..=max_phases {
        let boundary_ms = k * d;
        if boundary_ms <= elapsed_at_reference_ms {
            continue;
        }
        if k == max_phases {
            // The final boundary closes the last set and the workout.
            push_future(
                &mut cues,
                CueKind::SetCompletionWarning {
                    set_index: config.total_sets,
                },
                k,
                boundary_ms,
                tuning.set_completion_lead_ms(),
                reference_now,
                elapsed_at_reference_ms,
            );
            push_future(
                &mut cues,
                CueKind::WorkoutComplete,
                k,
                boundary_ms,
                tuning.workout_complete_lead_ms(),
                reference_now,
                elapsed_at_reference_ms,
            );
        } else if k % 2 == 0 {
            push_future(
                &mut cues,
                CueKind::SetCompletionWarning {
                    set_index: (k / 2) as u32,
                },
                k,
                boundary_ms,
                tuning.set_completion_lead_ms(),
                reference_now,
                elapsed_at_reference_ms,
            );
        } else {
            push_future(
                &mut cues,
                CueKind::PhaseTransitionWarning,
                k,
                boundary_ms,
                tuning.warning_lead_ms(),
                reference_now,
                elapsed_at_reference_ms,
            );
        }
    }

    cues.sort_by(|a, b| {
        a.due_at
            .cmp(&b.due_at)
            .then(b.kind.priority().cmp(&a.kind.priority()))
            .then(a.boundary_phase.cmp(&b.boundary_phase))
    });
    drop_shadowed_warnings(&mut cues, tuning.delivery_tolerance_ms());
    cues
}

fn push_future(
    out: &mut Vec<CueDescriptor>,
    kind: CueKind,
    boundary_phase: u64,
    boundary_elapsed_ms: u64,
    lead_ms: u64,
    reference_now: DateTime<Utc>,
    elapsed_at_reference_ms: u64,
) {
    let until_boundary = boundary_elapsed_ms - elapsed_at_reference_ms;
    let due_at = reference_now + Duration::milliseconds(until_boundary as i64)
        - Duration::milliseconds(lead_ms as i64);
    if due_at <= reference_now {
        return;
    }
    out.push(CueDescriptor {
        kind,
        boundary_phase,
        boundary_elapsed_ms,
        lead_ms,
        due_at,
    });
}

/// Drop transition warnings that land inside the delivery tolerance of a
/// higher-priority cue. Two cues never share a tolerance window unless both
/// are announcements (the final set's announcement and the completion
/// notice legitimately sit next to each other).
fn drop_shadowed_warnings(cues: &mut Vec<CueDescriptor>, tolerance_ms: u64) {
    let keep: Vec<bool> = cues
        .iter()
        .map(|c| {
            if c.kind.priority() > 0 {
                return true;
            }
            !cues.iter().any(|other| {
                other.kind.priority() > c.kind.priority()
                    && (other.due_at - c.due_at).num_milliseconds().unsigned_abs() < tolerance_ms
            })
        })
        .collect();
    let mut idx = 0;
    cues.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::Intensity;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn config(d: u64, sets: u32) -> WorkoutConfig {
        WorkoutConfig::new(d, sets, Intensity::Low).unwrap()
    }

    fn tuning(warning: u64, set_completion: u64, tolerance: u64) -> CueTuning {
        CueTuning {
            warning_lead_secs: warning,
            set_completion_lead_secs: set_completion,
            workout_complete_lead_secs: 1,
            brief_interruption_threshold_secs: 3,
            delivery_tolerance_secs: tolerance,
        }
    }

    #[test]
    fn covers_every_remaining_boundary() {
        // 60s phases keep every cue clear of the tolerance window.
        let cues = schedule(&config(60, 2), &tuning(3, 5, 10), t0(), 0);
        let boundaries: Vec<u64> = cues.iter().map(|c| c.boundary_phase).collect();
        assert_eq!(boundaries, vec![1, 2, 3, 4, 4]);
    }

    #[test]
    fn final_boundary_gets_announcement_and_completion() {
        let cues = schedule(&config(60, 1), &tuning(3, 5, 10), t0(), 0);
        // Mid-set transition warning plus the two final-boundary cues.
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].kind, CueKind::PhaseTransitionWarning);
        assert_eq!(
            cues[1].kind,
            CueKind::SetCompletionWarning { set_index: 1 }
        );
        assert_eq!(cues[2].kind, CueKind::WorkoutComplete);
        assert!(cues[1].due_at < cues[2].due_at);
    }

    #[test]
    fn due_times_are_boundary_minus_lead() {
        let cues = schedule(&config(60, 1), &tuning(3, 5, 10), t0(), 0);
        assert_eq!(cues[0].due_at, t0() + Duration::seconds(57));
        assert_eq!(cues[1].due_at, t0() + Duration::seconds(115));
        assert_eq!(cues[2].due_at, t0() + Duration::seconds(119));
    }

    #[test]
    fn skips_boundaries_already_passed() {
        let cues = schedule(&config(60, 2), &tuning(3, 5, 10), t0(), 150_000);
        let boundaries: Vec<u64> = cues.iter().map(|c| c.boundary_phase).collect();
        assert_eq!(boundaries, vec![3, 4, 4]);
    }

    #[test]
    fn skips_cues_whose_due_time_already_passed() {
        // At elapsed 116s the final announcement (due 115s) is gone but the
        // completion notice (due 119s) is still ahead.
        let cues = schedule(&config(60, 1), &tuning(3, 5, 10), t0(), 116_000);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].kind, CueKind::WorkoutComplete);
    }

    #[test]
    fn transition_warning_inside_tolerance_of_announcement_is_dropped() {
        // 10s phases with a 10s tolerance: the transition warning at 7s sits
        // 8s from the set announcement at 15s and gets coalesced away.
        let cues = schedule(&config(10, 2), &tuning(3, 5, 10), t0(), 0);
        assert!(cues
            .iter()
            .all(|c| c.kind != CueKind::PhaseTransitionWarning));
    }

    #[test]
    fn transition_warning_survives_with_proportionate_tolerance() {
        let cues = schedule(&config(10, 2), &tuning(3, 5, 2), t0(), 0);
        assert!(cues
            .iter()
            .any(|c| c.kind == CueKind::PhaseTransitionWarning));
    }

    #[test]
    fn regeneration_is_deterministic() {
        let a = schedule(&config(45, 3), &tuning(3, 5, 10), t0(), 31_500);
        let b = schedule(&config(45, 3), &tuning(3, 5, 10), t0(), 31_500);
        assert_eq!(a, b);
    }

    #[test]
    fn ordered_by_due_time() {
        let cues = schedule(&config(60, 3), &tuning(3, 5, 10), t0(), 0);
        for pair in cues.windows(2) {
            assert!(pair[0].due_at <= pair[1].due_at);
        }
    }

    #[test]
    fn dedup_keys_by_kind() {
        assert_eq!(
            CueKind::PhaseTransitionWarning.dedup_key(3),
            "transition:3"
        );
        assert_eq!(
            CueKind::SetCompletionWarning { set_index: 2 }.dedup_key(4),
            "set-complete:2"
        );
        assert_eq!(CueKind::WorkoutComplete.dedup_key(4), "workout-complete");
    }
}
