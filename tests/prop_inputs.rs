//! Property-based tests for the post-processing policy and the gradient
//! operator using proptest.

use mmmrs_inputs::gradient::{normalized_gradient, radial_spacing, GradientSign};
use mmmrs_inputs::postprocess::{
    apply_floor, clamp_magnitude, reject_outliers, repair_nonfinite, smooth_radial,
};
use mmmrs_inputs::settings::PipelineSettings;
use mmmrs_inputs::synthetic::{synthetic_discharge, SyntheticDischargeOpts};
use mmmrs_inputs::variables::{Origin, Variables, DEFINITIONS};
use mmmrs_inputs::PipelineBuilder;
use ndarray::{s, Array1, Array2, Axis};
use proptest::prelude::*;

fn edge_grid(n: usize) -> Array1<f64> {
    Array1::linspace(0.0, 1.0, n)
}

fn center_grid(xb: &Array1<f64>) -> Array1<f64> {
    let upper = xb.slice(s![1..]);
    let lower = xb.slice(s![..-1]);
    (&upper + &lower) * 0.5
}

fn columns(profile: &Array1<f64>, n_time: usize) -> Array2<f64> {
    let mut values = Array2::zeros((profile.len(), n_time));
    for mut column in values.axis_iter_mut(Axis(1)) {
        column.assign(profile);
    }
    values
}

/// A boundary-grid profile shaped by `f` over the normalized radius.
fn boundary_profile<F>(vars: &Variables, f: F) -> Array2<f64>
where
    F: Fn(f64) -> f64,
{
    vars.values("xb").unwrap().mapv(f)
}

proptest! {
    /// A radially constant column passes through the moving average
    /// unchanged, up to accumulation rounding.
    #[test]
    fn smoothing_preserves_constants(
        n in 3usize..60,
        window in 0usize..15,
        value in -1e6f64..1e6,
    ) {
        let mut values = Array2::from_elem((n, 2), value);
        smooth_radial(&mut values, window);
        for &v in values.iter() {
            prop_assert!(
                (v - value).abs() <= 1e-9 * value.abs().max(1.0),
                "constant {} drifted to {}", value, v
            );
        }
    }

    /// Smoothing never leaves the envelope of the input samples.
    #[test]
    fn smoothing_stays_inside_the_input_envelope(
        samples in prop::collection::vec(-1e3f64..1e3, 5..60),
        window in 2usize..11,
    ) {
        let lo = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let n = samples.len();
        let mut values = Array2::from_shape_vec((n, 1), samples).unwrap();
        smooth_radial(&mut values, window);
        for &v in values.iter() {
            prop_assert!(
                v >= lo - 1e-9 && v <= hi + 1e-9,
                "smoothed value {} left [{}, {}]", v, lo, hi
            );
        }
    }

    /// The clamp confines every finite entry and leaves NaN alone for the
    /// repair stage.
    #[test]
    fn clamp_confines_finite_entries(
        samples in prop::collection::vec(
            prop_oneof![
                8 => -1e6f64..1e6,
                1 => Just(f64::INFINITY),
                1 => Just(f64::NAN),
            ],
            1..50,
        ),
        bound in 1.0f64..1e3,
    ) {
        let nan_in = samples.iter().filter(|v| v.is_nan()).count();
        let n = samples.len();
        let mut values = Array2::from_shape_vec((n, 1), samples).unwrap();
        clamp_magnitude(&mut values, bound);
        let nan_out = values.iter().filter(|v| v.is_nan()).count();
        prop_assert_eq!(nan_in, nan_out);
        for &v in values.iter() {
            if !v.is_nan() {
                prop_assert!(v.abs() <= bound, "{} escaped the clamp", v);
            }
        }
    }

    /// The floor raises what it must and touches nothing else.
    #[test]
    fn floor_only_raises(
        samples in prop::collection::vec(-1e3f64..1e3, 1..50),
        floor in -10.0f64..10.0,
    ) {
        let original = samples.clone();
        let n = samples.len();
        let mut values = Array2::from_shape_vec((n, 1), samples).unwrap();
        apply_floor(&mut values, floor);
        for (i, &v) in values.iter().enumerate() {
            prop_assert!(v >= floor);
            if original[i] >= floor {
                prop_assert_eq!(v, original[i]);
            }
        }
    }

    /// Repair always ends with a fully finite column and only rewrites the
    /// entries that needed it.
    #[test]
    fn repair_heals_every_hole(
        samples in prop::collection::vec(
            prop_oneof![
                6 => -1e6f64..1e6,
                1 => Just(f64::INFINITY),
                1 => Just(f64::NEG_INFINITY),
                1 => Just(f64::NAN),
            ],
            1..60,
        ),
    ) {
        let original = samples.clone();
        let holes = original.iter().filter(|v| !v.is_finite()).count();
        let n = samples.len();
        let mut values = Array2::from_shape_vec((n, 1), samples).unwrap();
        let repaired = repair_nonfinite(&mut values);
        prop_assert_eq!(repaired, holes);
        for (i, &v) in values.iter().enumerate() {
            prop_assert!(v.is_finite());
            if original[i].is_finite() {
                prop_assert_eq!(v, original[i]);
            }
        }
    }

    /// A single gross spike on a sloped profile is always caught, and the
    /// rest of the column survives.
    #[test]
    fn outlier_rejection_catches_a_gross_spike(
        n in 6usize..60,
        spike_slot in 0usize..60,
        spike_scale in 100.0f64..1e4,
    ) {
        let spike_at = spike_slot % n;
        let mut samples: Vec<f64> = (0..n).map(|i| i as f64).collect();
        samples[spike_at] = n as f64 * spike_scale;
        let mut values = Array2::from_shape_vec((n, 1), samples).unwrap();
        let rejected = reject_outliers(&mut values);
        prop_assert_eq!(rejected, 1);
        prop_assert!(values[[spike_at, 0]].is_nan());
    }
}

proptest! {
    /// Constant profiles have vanishing normalized gradients on any grid.
    #[test]
    fn gradient_of_a_constant_vanishes(
        n in 6usize..40,
        level in 0.1f64..1e6,
    ) {
        let xb = edge_grid(n);
        let x = center_grid(&xb);
        let rmin = columns(&xb.mapv(|v| 0.6 * v), 2);
        let rmaj = Array2::from_elem((n, 2), 1.5);
        let source = Array2::from_elem((n, 2), level);
        let drmin = radial_spacing(&rmin);

        let gradient = normalized_gradient(
            "gx",
            &source,
            &drmin,
            &x,
            &xb,
            &rmaj,
            GradientSign::Negative,
        )
        .unwrap();
        for &g in gradient.iter() {
            prop_assert!(g.abs() < 1e-9, "constant profile produced gradient {}", g);
        }
    }

    /// A linear profile has a constant derivative, so the spline pass must
    /// reproduce `rmaj * slope / source` on the edges.
    #[test]
    fn gradient_of_a_linear_profile_is_exact(
        n in 6usize..40,
        offset in 5.0f64..20.0,
        slope in -3.0f64..3.0,
    ) {
        let xb = edge_grid(n);
        let x = center_grid(&xb);
        let rmin = columns(&xb.mapv(|v| 0.6 * v), 1);
        let rmaj = Array2::from_elem((n, 1), 1.4);
        let source = rmin.mapv(|r| offset + slope * r);
        let drmin = radial_spacing(&rmin);

        let gradient = normalized_gradient(
            "gx",
            &source,
            &drmin,
            &x,
            &xb,
            &rmaj,
            GradientSign::Positive,
        )
        .unwrap();
        for (g, s) in gradient.iter().zip(source.iter()) {
            let expected = 1.4 * slope / s;
            prop_assert!(
                (g - expected).abs() < 1e-7 * expected.abs().max(1.0),
                "expected {}, got {}", expected, g
            );
        }
    }
}

proptest! {
    /// The derived smoothing window is always odd and at least 3.
    #[test]
    fn smoothing_window_is_odd_and_at_least_three(points in 0usize..100_000) {
        let settings = PipelineSettings {
            input_points: points,
            ..Default::default()
        };
        let window = settings.smoothing_window();
        prop_assert!(window >= 3);
        prop_assert_eq!(window % 2, 1);
        prop_assert!(window <= points / 20 + 3);
    }
}

proptest! {
    /// The full pipeline succeeds and yields finite, correctly shaped
    /// profiles over a range of grid sizes.
    #[test]
    fn pipeline_survives_any_grid_size(
        points in 6usize..32,
        times in 1usize..4,
    ) {
        let opts = SyntheticDischargeOpts {
            points,
            times,
            ..Default::default()
        };
        let vars = synthetic_discharge(&opts);
        let settings = PipelineSettings {
            input_points: points,
            ..Default::default()
        };
        let mut builder = PipelineBuilder::default();
        builder.variables(&vars);
        builder.settings(&settings);
        let derived = builder.run().unwrap();

        for def in DEFINITIONS {
            if def.origin != Origin::Derived {
                continue;
            }
            let values = derived.values(def.name).unwrap();
            prop_assert_eq!(values.dim(), (points, times));
            for &v in values.iter() {
                prop_assert!(v.is_finite(), "`{}` kept {}", def.name, v);
            }
        }
    }

    /// Quasi-neutral bookkeeping: however the measured densities look, the
    /// stored hydrogenic and thermal totals match their definitions
    /// elementwise once the statistical stages are off.
    #[test]
    fn density_identities_hold_for_random_profiles(
        ne_scale in 1e18f64..1e20,
        ne_curv in 0.0f64..0.9,
        nd_frac in 0.1f64..1.2,
        nf_frac in 0.0f64..0.2,
        nz_frac in 0.001f64..0.1,
    ) {
        let opts = SyntheticDischargeOpts {
            points: 15,
            times: 2,
            ..Default::default()
        };
        let mut vars = synthetic_discharge(&opts);
        let ne = boundary_profile(&vars, |r| ne_scale * (1.05 - ne_curv * r * r));
        let nd = ne.mapv(|v| nd_frac * v);
        let nz = ne.mapv(|v| nz_frac * v);
        vars.set_values("nf", ne.mapv(|v| nf_frac * v)).unwrap();
        vars.set_values("ne", ne).unwrap();
        vars.set_values("nd", nd.clone()).unwrap();
        vars.set_values("nz", nz.clone()).unwrap();

        let settings = PipelineSettings {
            apply_smoothing: false,
            reject_outliers: false,
            input_points: 15,
            ..Default::default()
        };
        let mut builder = PipelineBuilder::default();
        builder.variables(&vars);
        builder.settings(&settings);
        let derived = builder.run().unwrap();

        let nh0 = derived.values("nh0").unwrap();
        let nh = derived.values("nh").unwrap();
        let ni = derived.values("ni").unwrap();
        for ((i, t), &h) in nh.indexed_iter() {
            let hydrogenic = nh0[[i, t]] + nd[[i, t]];
            prop_assert!((h / hydrogenic - 1.0).abs() < 1e-12);
        }
        for ((i, t), &total) in ni.indexed_iter() {
            let thermal = nd[[i, t]] + nz[[i, t]] + nh0[[i, t]];
            prop_assert!((total / thermal - 1.0).abs() < 1e-12);
        }
    }

    /// The effective shear handles any plasma shaping: negative radicands
    /// go NaN, the repair stage heals them, and the floor keeps the result
    /// non-negative.
    #[test]
    fn effective_shear_never_negative_for_random_shaping(
        elong0 in 0.5f64..2.5,
        elong_curv in -0.5f64..0.5,
        q0 in 0.8f64..3.0,
        q_curv in 0.0f64..4.0,
    ) {
        let opts = SyntheticDischargeOpts {
            points: 15,
            times: 1,
            ..Default::default()
        };
        let mut vars = synthetic_discharge(&opts);
        let elong = boundary_profile(&vars, |r| elong0 + elong_curv * r * r);
        let q = boundary_profile(&vars, |r| q0 + q_curv * r * r);
        vars.set_values("elong", elong).unwrap();
        vars.set_values("q", q).unwrap();

        let settings = PipelineSettings {
            input_points: 15,
            ..Default::default()
        };
        let mut builder = PipelineBuilder::default();
        builder.variables(&vars);
        builder.settings(&settings);
        let derived = builder.run().unwrap();

        for &v in derived.values("shat").unwrap().iter() {
            prop_assert!(v >= 0.0, "shat went negative: {}", v);
        }
    }
}
