// mmmrs-inputs/src/postprocess.rs
//
// Every computed variable and gradient passes through one of the two fixed
// sequences below. Degenerate arithmetic upstream (division by ~0 near the
// magnetic axis, negative radicands) is allowed to produce non-finite
// entries; this module is where they get absorbed.

use crate::settings::PipelineSettings;
use crate::variables::Variable;
use log::{debug, trace};
use ndarray::{Array2, Axis};

/// Largest magnitude a normalized gradient may keep.
pub const GRADIENT_BOUND: f64 = 100.0;

/// Modified z-score cutoff for outlier rejection.
const OUTLIER_THRESHOLD: f64 = 3.5;

/// Scale relating the median absolute deviation to a normal standard
/// deviation.
const MAD_SCALE: f64 = 0.6745;

/// Fewest finite samples per time column for outlier statistics to mean
/// anything.
const OUTLIER_MIN_SAMPLES: usize = 5;

/// Post-processing sequence for a computed variable: smoothing, floor,
/// outlier rejection, non-finite repair.
pub fn finalize_variable(name: &str, variable: &mut Variable, settings: &PipelineSettings) {
    let smooth = settings.apply_smoothing && variable.smooth;
    let floor = variable.min_value;
    if let Some(values) = variable.values.as_mut() {
        if smooth {
            smooth_radial(values, settings.smoothing_window());
        }
        finish(name, values, floor, settings);
    }
}

/// Post-processing sequence for a gradient: smoothing, magnitude clamp,
/// floor, outlier rejection, non-finite repair.
pub fn finalize_gradient(name: &str, variable: &mut Variable, settings: &PipelineSettings) {
    let smooth = settings.apply_smoothing && variable.smooth;
    let floor = variable.min_value;
    if let Some(values) = variable.values.as_mut() {
        if smooth {
            smooth_radial(values, settings.smoothing_window());
        }
        clamp_magnitude(values, GRADIENT_BOUND);
        finish(name, values, floor, settings);
    }
}

fn finish(name: &str, values: &mut Array2<f64>, floor: Option<f64>, settings: &PipelineSettings) {
    if let Some(floor) = floor {
        apply_floor(values, floor);
    }
    if settings.reject_outliers {
        let rejected = reject_outliers(values);
        if rejected > 0 {
            trace!("{}: rejected {} outliers", name, rejected);
        }
    }
    let repaired = repair_nonfinite(values);
    if repaired > 0 {
        debug!("{}: repaired {} non-finite values", name, repaired);
    }
}

/// Centered moving average along the radial axis, per time column. The
/// window is truncated at the profile edges and normalized by the number of
/// finite samples inside it, so radially constant columns come through
/// exactly. Non-finite entries pass through untouched and are excluded from
/// neighboring averages.
pub fn smooth_radial(values: &mut Array2<f64>, window: usize) {
    if window < 2 {
        return;
    }
    let (n_radial, n_time) = values.dim();
    let half = window / 2;
    let mut smoothed = Array2::zeros((n_radial, n_time));
    for t in 0..n_time {
        for i in 0..n_radial {
            let center = values[[i, t]];
            if !center.is_finite() {
                smoothed[[i, t]] = center;
                continue;
            }
            let lo = i.saturating_sub(half);
            let hi = usize::min(i + half + 1, n_radial);
            let mut sum = 0.0;
            let mut count = 0usize;
            for k in lo..hi {
                let v = values[[k, t]];
                if v.is_finite() {
                    sum += v;
                    count += 1;
                }
            }
            smoothed[[i, t]] = sum / count as f64;
        }
    }
    *values = smoothed;
}

/// Clamp into `[-bound, bound]`. Infinities collapse onto the bound; NaN
/// passes through for the repair stage.
pub fn clamp_magnitude(values: &mut Array2<f64>, bound: f64) {
    values.mapv_inplace(|v| {
        if v < -bound {
            -bound
        } else if v > bound {
            bound
        } else {
            v
        }
    });
}

/// Raise values below `floor` to `floor`. NaN passes through untouched so
/// degenerate entries still reach the repair stage.
pub fn apply_floor(values: &mut Array2<f64>, floor: f64) {
    values.mapv_inplace(|v| if v < floor { floor } else { v });
}

/// Mark outliers as NaN, per time column, using the modified z-score over
/// finite samples. Columns that are too short or have zero spread are left
/// alone. Returns the number of rejected entries; the repair stage heals
/// them.
pub fn reject_outliers(values: &mut Array2<f64>) -> usize {
    let mut rejected = 0;
    for mut column in values.axis_iter_mut(Axis(1)) {
        let mut finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < OUTLIER_MIN_SAMPLES {
            continue;
        }
        let median = median_in_place(&mut finite);
        let mut deviations: Vec<f64> = finite.iter().map(|v| (v - median).abs()).collect();
        let mad = median_in_place(&mut deviations);
        if mad <= f64::EPSILON {
            continue;
        }
        for v in column.iter_mut() {
            if v.is_finite() && MAD_SCALE * (*v - median).abs() / mad > OUTLIER_THRESHOLD {
                *v = f64::NAN;
                rejected += 1;
            }
        }
    }
    rejected
}

/// Replace non-finite entries with the nearest finite value along the
/// radial axis. The search runs over a snapshot of the column so repairs
/// never feed later lookups; inward neighbors win ties; a fully degenerate
/// column falls back to 0.0. Returns the number of repaired entries.
pub fn repair_nonfinite(values: &mut Array2<f64>) -> usize {
    let mut repaired = 0;
    for mut column in values.axis_iter_mut(Axis(1)) {
        let snapshot = column.to_vec();
        for (i, v) in snapshot.iter().enumerate() {
            if v.is_finite() {
                continue;
            }
            column[i] = nearest_finite(&snapshot, i).unwrap_or(0.0);
            repaired += 1;
        }
    }
    repaired
}

fn nearest_finite(snapshot: &[f64], index: usize) -> Option<f64> {
    for distance in 1..snapshot.len() {
        if index >= distance && snapshot[index - distance].is_finite() {
            return Some(snapshot[index - distance]);
        }
        let outward = index + distance;
        if outward < snapshot.len() && snapshot[outward].is_finite() {
            return Some(snapshot[outward]);
        }
    }
    None
}

fn median_in_place(samples: &mut [f64]) -> f64 {
    samples.sort_unstable_by(f64::total_cmp);
    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        0.5 * (samples[mid - 1] + samples[mid])
    } else {
        samples[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn variable(values: Array2<f64>, smooth: bool, min_value: Option<f64>) -> Variable {
        Variable {
            values: Some(values),
            units: "",
            label: "Test Profile",
            smooth,
            min_value,
        }
    }

    #[test]
    fn test_smoothing_preserves_constant_columns() {
        let mut values = Array2::from_elem((9, 2), 4.2);
        smooth_radial(&mut values, 3);
        for v in values.iter() {
            assert!((v - 4.2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smoothing_flattens_a_spike() {
        let mut values = array![[1.0], [1.0], [10.0], [1.0], [1.0]];
        smooth_radial(&mut values, 3);
        assert!(values[[2, 0]] < 10.0);
        assert!(values[[2, 0]] > 1.0);
        assert!(values[[1, 0]] > 1.0);
    }

    #[test]
    fn test_smoothing_keeps_nan_in_place() {
        let mut values = array![[1.0], [f64::NAN], [3.0]];
        smooth_radial(&mut values, 3);
        assert!(values[[1, 0]].is_nan());
        assert!((values[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((values[[2, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_window_is_a_noop() {
        let mut values = array![[1.0], [5.0], [1.0]];
        let before = values.clone();
        smooth_radial(&mut values, 1);
        assert_eq!(values, before);
    }

    #[test]
    fn test_clamp_magnitude_semantics() {
        let mut values = array![[150.0], [-250.0], [f64::INFINITY], [f64::NAN], [7.0]];
        clamp_magnitude(&mut values, 100.0);
        assert!((values[[0, 0]] - 100.0).abs() < 1e-12);
        assert!((values[[1, 0]] + 100.0).abs() < 1e-12);
        assert!((values[[2, 0]] - 100.0).abs() < 1e-12);
        assert!(values[[3, 0]].is_nan());
        assert!((values[[4, 0]] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_floor_lets_nan_through() {
        let mut values = array![[-5.0], [f64::NAN], [2.0]];
        apply_floor(&mut values, 1e-6);
        assert!((values[[0, 0]] - 1e-6).abs() < 1e-18);
        assert!(values[[1, 0]].is_nan());
        assert!((values[[2, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_rejection_marks_spike_as_nan() {
        let mut values = array![[10.0], [11.0], [9.0], [10.5], [9.5], [10.0], [50.0]];
        let rejected = reject_outliers(&mut values);
        assert_eq!(rejected, 1);
        assert!(values[[6, 0]].is_nan());
        assert!((values[[0, 0]] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_rejection_skips_short_and_flat_columns() {
        let mut short = array![[1.0], [100.0], [1.0]];
        assert_eq!(reject_outliers(&mut short), 0);

        // Zero spread: the median absolute deviation vanishes.
        let mut flat = array![[2.0], [2.0], [2.0], [2.0], [2.0], [2.0]];
        assert_eq!(reject_outliers(&mut flat), 0);
    }

    #[test]
    fn test_repair_takes_nearest_finite_inward_first() {
        let mut values = array![[f64::NAN], [1.0], [f64::NAN], [3.0], [f64::NAN]];
        let repaired = repair_nonfinite(&mut values);
        assert_eq!(repaired, 3);
        assert!((values[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((values[[2, 0]] - 1.0).abs() < 1e-12);
        assert!((values[[4, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_repair_falls_back_to_zero() {
        let mut values = array![[f64::NAN, 1.0], [f64::INFINITY, 2.0]];
        let repaired = repair_nonfinite(&mut values);
        assert_eq!(repaired, 2);
        assert!((values[[0, 0]]).abs() < 1e-12);
        assert!((values[[1, 0]]).abs() < 1e-12);
        assert!((values[[1, 1]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_variable_applies_floor_and_repair() {
        let settings = PipelineSettings {
            apply_smoothing: false,
            reject_outliers: false,
            ..Default::default()
        };
        let mut var = variable(array![[-3.0], [f64::NAN], [2.0]], true, Some(1e-6));
        finalize_variable("np", &mut var, &settings);
        let values = var.values.unwrap();
        assert!((values[[0, 0]] - 1e-6).abs() < 1e-18);
        assert!((values[[1, 0]] - 1e-6).abs() < 1e-12);
        assert!((values[[2, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_gradient_bounds_magnitude() {
        let settings = PipelineSettings {
            apply_smoothing: false,
            reject_outliers: false,
            ..Default::default()
        };
        let mut var = variable(array![[0.0], [500.0], [f64::NAN]], true, None);
        finalize_gradient("gx", &mut var, &settings);
        let values = var.values.unwrap();
        for v in values.iter() {
            assert!(v.is_finite());
            assert!(v.abs() <= GRADIENT_BOUND);
        }
        assert!((values[[1, 0]] - GRADIENT_BOUND).abs() < 1e-12);
    }
}
