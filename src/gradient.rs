// mmmrs-inputs/src/gradient.rs

use ndarray::{s, Array1, Array2};
use ndarray_interp::interp1d::cubic_spline::CubicSpline;
use ndarray_interp::interp1d::Interp1D;
use ndarray_interp::{BuilderError, InterpolateError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradientError {
    #[error("failed to build the interpolator for `{0}`: {1}")]
    Interpolator(&'static str, BuilderError),
    #[error("failed to evaluate the interpolant for `{0}`: {1}")]
    Interpolation(&'static str, InterpolateError),
}

/// Sign convention of a normalized gradient. Quantities that decrease
/// outward (densities, temperatures, velocities) negate the radial
/// difference so their gradients come out positive in the usual case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradientSign {
    Positive,
    Negative,
}

/// One gradient computation: `name = rmaj * d(source)/dr / source`, with
/// the spacing signed per the convention above.
#[derive(Clone, Copy, Debug)]
pub struct GradientSpec {
    pub name: &'static str,
    pub source: &'static str,
    pub sign: GradientSign,
}

/// Radial spacing of the boundary grid: adjacent-row differences of the
/// minor radius, one row fewer than its input.
pub fn radial_spacing(rmin: &Array2<f64>) -> Array2<f64> {
    &rmin.slice(s![1.., ..]) - &rmin.slice(s![..-1, ..])
}

/// Normalized logarithmic gradient of `source` on the boundary grid.
///
/// Adjacent rows are differenced onto the cell centers and divided by the
/// radial spacing, the result is carried back onto the cell edges by an
/// extrapolating cubic spline along the radial axis, and the edge values
/// are scaled by `rmaj / source`. Division by a vanishing source is left
/// alone here; the post-processing policy absorbs the resulting
/// non-finite entries.
pub fn normalized_gradient(
    name: &'static str,
    source: &Array2<f64>,
    drmin: &Array2<f64>,
    x: &Array1<f64>,
    xb: &Array1<f64>,
    rmaj: &Array2<f64>,
    sign: GradientSign,
) -> Result<Array2<f64>, GradientError> {
    let diff = &source.slice(s![1.., ..]) - &source.slice(s![..-1, ..]);
    let mut dxvar = &diff / drmin;
    if sign == GradientSign::Negative {
        dxvar.mapv_inplace(|v| -v);
    }

    let interpolator = Interp1D::builder(dxvar)
        .x(x.clone())
        .strategy(CubicSpline::new().extrapolate(true))
        .build()
        .map_err(|e| GradientError::Interpolator(name, e))?;
    let edges = interpolator
        .interp_array(xb)
        .map_err(|e| GradientError::Interpolation(name, e))?;

    Ok(rmaj * &edges / source)
}
