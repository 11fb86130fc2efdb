//! Property-based tests for the reverb stages.
//!
//! Stability of the late loop for any reverberance below 1, tap ordering of
//! the velvet rotations, and crossfade bookkeeping under arbitrary resizes.

use chamber_core::{FilterDesigner, ResponseType, UNITY_GAIN};
use chamber_effects::{EarlyReflections, FEEDBACK_CEILING, ReverbUnit, VelvetTail};
use proptest::prelude::*;

const SR: f32 = 48000.0;

fn flat() -> FilterDesigner {
    FilterDesigner::design(ResponseType::Peak, 48000.0, 1000.0, UNITY_GAIN, 1.0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// For any reverberance below 1 and any window, the late loop stays
    /// finite and within the feedback ceiling for bounded input.
    #[test]
    fn late_loop_never_diverges(
        reverberance in 0.0f32..0.999,
        min in 1.0f32..2000.0,
        span in 1.0f32..10000.0,
        density in 200.0f32..2000.0,
        resonances in prop::collection::vec(1usize..47000, 0..6),
    ) {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [min, min + span], density, reverberance, &mut filter);
        unit.set_resonance(&resonances);

        for n in 0..8000 {
            let x = if n % 2000 == 0 { 1.0 } else { 0.0 };
            let y = unit.process(x, &mut filter).unwrap();
            prop_assert!(
                y.is_finite() && y.abs() <= FEEDBACK_CEILING * 1.0001,
                "sample {} diverged: {}", n, y
            );
        }
    }

    /// Rotations are ascending in offset and never gain with distance.
    #[test]
    fn rotations_are_sorted_and_attenuating(
        seed in any::<u32>(),
        bin_length in 8usize..400,
        rotation_count in 1usize..6,
    ) {
        let tail = VelvetTail::with_seed(48000, rotation_count, [10.0, 100.0], bin_length, SR, seed);
        for r in 0..rotation_count {
            let taps = tail.rotation(r).unwrap();
            for pair in taps.windows(2) {
                prop_assert!(pair[0].offset < pair[1].offset);
                prop_assert!(pair[0].gain.abs() >= pair[1].gain.abs());
            }
        }
    }

    /// The transition scalar stays in [0, 1] and the stage keeps producing
    /// finite output through any sequence of resizes.
    #[test]
    fn resizes_keep_transition_in_range(
        sizes in prop::collection::vec((1.0f32..200.0, 1.0f32..200.0, 1.0f32..60.0, 0usize..400), 1..8),
        seed in any::<u32>(),
    ) {
        let mut filter = flat();
        let mut er = EarlyReflections::with_seed(SR, 20.0, 20.0, 10.0, 0.4, &mut filter, seed);
        for (l, w, h, run) in sizes {
            er.set_size(l, w, h);
            for _ in 0..run {
                let y = er.process(0.5, &mut filter).unwrap();
                prop_assert!(y.is_finite());
                prop_assert!((0.0..=1.0).contains(&er.transition()));
            }
        }
    }
}
