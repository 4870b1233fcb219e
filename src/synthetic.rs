// mmmrs-inputs/src/synthetic.rs
//
// Analytic stand-in for a unit-converted discharge, shaped like a small
// spherical-torus plasma: parabolic kinetic profiles, rising safety
// factor, carbon impurity. The binaries and the integration tests feed on
// it instead of measurement files. The magnetic axis keeps its honest
// degeneracies (zero minor radius, infinite aspect ratio); absorbing those
// is the pipeline's job, not the generator's.

use crate::variables::Variables;
use ndarray::{s, Array1, Array2};

/// Grid and content knobs for the analytic test discharge.
#[derive(Clone, Debug)]
pub struct SyntheticDischargeOpts {
    /// Boundary-grid radial point count.
    pub points: usize,
    /// Time point count.
    pub times: usize,
    /// Populate `vpold` so the measured poloidal-velocity path is
    /// exercised; otherwise the pipeline falls back to zeros.
    pub measured_vpol: bool,
}

impl Default for SyntheticDischargeOpts {
    fn default() -> Self {
        Self {
            points: 51,
            times: 1,
            measured_vpol: false,
        }
    }
}

const MAJOR_RADIUS: f64 = 0.9;
const SHAFRANOV_SHIFT: f64 = 0.08;
const MINOR_RADIUS: f64 = 0.6;
const VACUUM_FIELD: f64 = 0.45;

/// Build the discharge container. Every measured entry is populated; the
/// derived entries stay empty for the pipeline.
pub fn synthetic_discharge(opts: &SyntheticDischargeOpts) -> Variables {
    let xb = Array1::linspace(0.0, 1.0, opts.points);
    let x = centers(&xb);
    let times = opts.times;

    // A few percent of drift between time points keeps the columns
    // distinct without changing the physics.
    let wobble = |t: usize| 1.0 + 0.02 * t as f64;

    let mut vars = Variables::new();
    let mut set = |name: &str, values: Array2<f64>| {
        vars.set_values(name, values)
            .expect("the definition table covers every synthetic profile");
    };

    set("xb", profile(&xb, times, |r, _| r));
    set("x", profile(&x, times, |r, _| r));
    set("rmin", profile(&xb, times, |r, _| MINOR_RADIUS * r));
    set(
        "rmaj",
        profile(&xb, times, |r, _| {
            MAJOR_RADIUS + SHAFRANOV_SHIFT * (1.0 - r * r)
        }),
    );
    set(
        "arat",
        profile(&xb, times, |r, _| {
            (MAJOR_RADIUS + SHAFRANOV_SHIFT * (1.0 - r * r)) / (MINOR_RADIUS * r)
        }),
    );
    set("bz", profile(&xb, times, |_, _| VACUUM_FIELD));
    set("q", profile(&xb, times, |r, _| 1.05 + 2.5 * r * r));
    set("elong", profile(&xb, times, |r, _| 1.7 + 0.25 * r * r));
    set(
        "te",
        profile(&xb, times, |r, t| {
            (1.2 * (1.0 - 0.8 * r * r) + 0.05) * wobble(t)
        }),
    );
    set(
        "ti",
        profile(&xb, times, |r, t| {
            (1.0 * (1.0 - 0.75 * r * r) + 0.05) * wobble(t)
        }),
    );

    let electron_density = |r: f64, t: usize| (4.5e19 * (1.0 - 0.7 * r * r) + 5.0e18) * wobble(t);
    set("ne", profile(&xb, times, electron_density));
    set(
        "nd",
        profile(&xb, times, |r, t| 0.78 * electron_density(r, t)),
    );
    set(
        "nf",
        profile(&xb, times, |r, t| {
            0.03 * (1.0 - r * r) * electron_density(r, t)
        }),
    );
    set(
        "nz",
        profile(&xb, times, |r, t| 0.012 * electron_density(r, t)),
    );
    set("zimp", profile(&xb, times, |_, _| 6.0));
    set("aimp", profile(&xb, times, |_, _| 12.0));
    set(
        "omega",
        profile(&xb, times, |r, t| 8.0e4 * (1.0 - 0.6 * r * r) * wobble(t)),
    );
    if opts.measured_vpol {
        set(
            "vpold",
            profile(&xb, times, |r, _| 2.0e3 * r * (1.0 - r)),
        );
    }

    vars
}

fn centers(xb: &Array1<f64>) -> Array1<f64> {
    let upper = xb.slice(s![1..]);
    let lower = xb.slice(s![..-1]);
    (&upper + &lower) * 0.5
}

fn profile<F>(grid: &Array1<f64>, times: usize, f: F) -> Array2<f64>
where
    F: Fn(f64, usize) -> f64,
{
    let mut values = Array2::zeros((grid.len(), times));
    for (i, &r) in grid.iter().enumerate() {
        for t in 0..times {
            values[[i, t]] = f(r, t);
        }
    }
    values
}
