//! Property tests for the projection and scheduling laws.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::cue::schedule;
    use crate::events::Event;
    use crate::settings::CueTuning;
    use crate::timer::TimerEngine;
    use crate::workout::{project, Intensity, WorkoutConfig};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn arb_intensity() -> impl Strategy<Value = Intensity> {
        prop_oneof![Just(Intensity::Low), Just(Intensity::High)]
    }

    proptest! {
        #[test]
        fn projection_is_idempotent(
            d in 1u64..=600,
            sets in 1u32..=16,
            elapsed in 0u64..=20_000_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            prop_assert_eq!(project(&config, elapsed), project(&config, elapsed));
        }

        #[test]
        fn completion_flips_exactly_at_the_threshold(
            d in 1u64..=600,
            sets in 1u32..=16,
            overshoot in 0u64..=10_000_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            let total = config.total_duration_ms();
            prop_assert!(!project(&config, total - 1).completed);
            prop_assert!(project(&config, total + overshoot).completed);
        }

        #[test]
        fn intensity_alternates_by_phase_parity(
            d in 1u64..=600,
            sets in 1u32..=16,
            elapsed in 0u64..=20_000_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            let state = project(&config, elapsed);
            if !state.completed {
                let parity_even = (elapsed / config.phase_duration_ms()) % 2 == 0;
                prop_assert_eq!(state.intensity == start, parity_even);
            }
        }

        #[test]
        fn remaining_decreases_by_exactly_the_delta_within_a_phase(
            d in 1u64..=600,
            sets in 1u32..=16,
            elapsed in 0u64..=20_000_000,
            delta in 0u64..=1_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            let before = project(&config, elapsed);
            let after = project(&config, elapsed + delta);
            if before.phase_index == after.phase_index && !before.completed {
                prop_assert_eq!(before.phase_remaining_ms - after.phase_remaining_ms, delta);
            }
        }

        #[test]
        fn schedule_regeneration_is_deterministic(
            d in 1u64..=600,
            sets in 1u32..=16,
            elapsed in 0u64..=20_000_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            let tuning = CueTuning::default();
            let a = schedule(&config, &tuning, t0(), elapsed);
            let b = schedule(&config, &tuning, t0(), elapsed);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn schedule_is_ordered_and_future_only(
            d in 1u64..=600,
            sets in 1u32..=16,
            elapsed in 0u64..=20_000_000,
            start in arb_intensity(),
        ) {
            let config = WorkoutConfig::new(d, sets, start).unwrap();
            let cues = schedule(&config, &CueTuning::default(), t0(), elapsed);
            for cue in &cues {
                prop_assert!(cue.due_at > t0());
                prop_assert!(cue.boundary_elapsed_ms > elapsed);
            }
            for pair in cues.windows(2) {
                prop_assert!(pair[0].due_at <= pair[1].due_at);
            }
        }

        #[test]
        fn countdown_never_jumps_under_irregular_sub_threshold_ticks(
            gaps in prop::collection::vec(1u64..=2_900, 1..60),
        ) {
            let config = WorkoutConfig::new(20, 3, Intensity::Low).unwrap();
            let mut engine = TimerEngine::new(config, CueTuning::default());
            let mut events = engine.start(t0());

            let mut clock = 0u64;
            for gap in gaps {
                clock += gap;
                events.extend(engine.tick(t0() + Duration::milliseconds(clock as i64)));
            }

            let mut last: Option<(u32, Intensity, u64)> = None;
            for event in &events {
                if let Event::StateChanged {
                    set_index,
                    intensity,
                    phase_remaining_ms,
                    completed: false,
                    ..
                } = event
                {
                    if let Some((prev_set, prev_intensity, prev_remaining)) = last {
                        if prev_set == *set_index && prev_intensity == *intensity {
                            prop_assert!(*phase_remaining_ms <= prev_remaining);
                        }
                    }
                    last = Some((*set_index, *intensity, *phase_remaining_ms));
                }
            }
        }
    }
}
