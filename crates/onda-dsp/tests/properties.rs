//! Property-based tests for the filter primitives.
//!
//! Uses proptest to verify the contracts the demodulator chains lean on:
//! linearity of the FIR path, rate guarantees of the decimator and
//! interpolator, fixed-point tracking, and dBFS monotonicity.

use onda_dsp::{DbfsCalculator, Decimator, FirFilter, FirFilterQ15, Interpolator};
use proptest::prelude::*;

fn tap_vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-0.99f32..0.99, 1..48)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Feeding the unit impulse reproduces the taps, then zeros.
    #[test]
    fn fir_impulse_response_is_the_tap_sequence(taps in tap_vector()) {
        let mut fir = FirFilter::new(&taps).unwrap();

        prop_assert_eq!(fir.filter(1.0), taps[0]);
        for &tap in &taps[1..] {
            prop_assert_eq!(fir.filter(0.0), tap);
        }
        for _ in 0..8 {
            prop_assert_eq!(fir.filter(0.0), 0.0);
        }
    }

    /// FIR(a*x + b*y) == a*FIR(x) + b*FIR(y), sample-wise.
    #[test]
    fn fir_is_linear(
        taps in tap_vector(),
        x in prop::collection::vec(-1.0f32..1.0, 32),
        y in prop::collection::vec(-1.0f32..1.0, 32),
        a in -4.0f32..4.0,
        b in -4.0f32..4.0,
    ) {
        let mut filter_x = FirFilter::new(&taps).unwrap();
        let mut filter_y = FirFilter::new(&taps).unwrap();
        let mut filter_mixed = FirFilter::new(&taps).unwrap();

        for (&sample_x, &sample_y) in x.iter().zip(&y) {
            let separate = a * filter_x.filter(sample_x) + b * filter_y.filter(sample_y);
            let mixed = filter_mixed.filter(a * sample_x + b * sample_y);
            prop_assert!(
                (separate - mixed).abs() < 1e-3,
                "linearity violated: {} vs {}", separate, mixed
            );
        }
    }

    /// A double reset is indistinguishable from a single one.
    #[test]
    fn fir_reset_is_idempotent(
        taps in tap_vector(),
        warmup in prop::collection::vec(-1.0f32..1.0, 0..64),
    ) {
        let mut once = FirFilter::new(&taps).unwrap();
        let mut twice = FirFilter::new(&taps).unwrap();

        for &sample in &warmup {
            once.filter(sample);
            twice.filter(sample);
        }

        once.reset();
        twice.reset();
        twice.reset();

        // Post-reset, both must replay the impulse response.
        prop_assert_eq!(once.filter(1.0), twice.filter(1.0));
        for _ in 1..taps.len() {
            prop_assert_eq!(once.filter(0.0), twice.filter(0.0));
        }
    }

    /// k*M + r inputs produce exactly k outputs.
    #[test]
    fn decimator_output_rate(
        factor in 1usize..8,
        groups in 0usize..20,
        remainder_seed in 0usize..8,
    ) {
        let taps = vec![0.1f32; factor * 4];
        let mut decimator = Decimator::new(&taps, factor).unwrap();

        let remainder = remainder_seed % factor;
        let inputs = groups * factor + remainder;

        let mut outputs = 0;
        for sample in 0..inputs {
            if decimator.decimate(sample as f32).is_some() {
                outputs += 1;
            }
        }

        prop_assert_eq!(outputs, groups);
    }

    /// With M=1 the decimator is a plain FIR.
    #[test]
    fn decimator_unity_factor_equals_fir(
        taps in tap_vector(),
        input in prop::collection::vec(-1.0f32..1.0, 64),
    ) {
        let mut decimator = Decimator::new(&taps, 1).unwrap();
        let mut fir = FirFilter::new(&taps).unwrap();

        for &sample in &input {
            prop_assert_eq!(decimator.decimate(sample), Some(fir.filter(sample)));
        }
    }

    /// k inputs produce exactly k*L outputs.
    #[test]
    fn interpolator_output_rate(factor in 1usize..8, inputs in 0usize..64) {
        let prototype = vec![0.25f32; factor * 4];
        let mut interpolator = Interpolator::new(&prototype, factor).unwrap();
        let mut frame = vec![0.0f32; factor];

        let mut outputs = 0;
        for sample in 0..inputs {
            interpolator.interpolate(sample as f32, &mut frame);
            outputs += frame.len();
        }

        prop_assert_eq!(outputs, inputs * factor);
    }

    /// The Q15 filter tracks the float reference within 2 LSBs over a
    /// long random input.
    #[test]
    fn q15_tracks_float_reference(seed in any::<u32>()) {
        let taps = [0.1f32, -0.3, 0.5, -0.3, 0.1];
        let mut q15 = FirFilterQ15::from_float_taps(&taps).unwrap();
        let mut float = FirFilter::new(&taps).unwrap();

        let mut state = seed | 1;
        for _ in 0..1000 {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let x = (state >> 16) as i16;

            let got = f32::from(q15.filter(x));
            let want = float.filter(f32::from(x));
            prop_assert!(
                (got - want).abs() <= 2.0,
                "Q15 drifted: {} vs {}", got, want
            );
        }
    }

    /// dBFS conversion is monotone non-decreasing in magnitude.
    #[test]
    fn dbfs_is_monotone(word_length in 1u32..=31, base in any::<u32>()) {
        let calculator = DbfsCalculator::new(word_length).unwrap();

        let low = base % calculator.full_scale().max(1);
        for offset in 0..64u32 {
            let a = calculator.magnitude_to_dbfs(low.saturating_add(offset));
            let b = calculator.magnitude_to_dbfs(low.saturating_add(offset + 1));
            prop_assert!(b >= a, "dbfs regressed between {} and {}", offset, offset + 1);
        }
    }
}
