//! Physical constants shared by the derived-variable formulas.
//!
//! Values follow CODATA 2010, which is what the upstream profile data was
//! prepared against; keeping them bit-identical makes derived profiles
//! reproducible across toolchains.

use std::f64::consts::PI;

/// Elementary charge \[C\].
pub const ELEMENTARY_CHARGE: f64 = 1.602176565e-19;

/// Vacuum permittivity \[F m^-1\].
pub const VACUUM_PERMITTIVITY: f64 = 8.854187817e-12;

/// Vacuum permeability \[H m^-1\].
pub const VACUUM_PERMEABILITY: f64 = 4.0e-7 * PI;

/// Electron rest mass \[kg\].
pub const ELECTRON_MASS: f64 = 9.10938215e-31;

/// Proton rest mass \[kg\].
pub const PROTON_MASS: f64 = 1.672621777e-27;

/// Boltzmann conversion for temperatures carried in keV \[J keV^-1\].
pub const JOULES_PER_KEV: f64 = ELEMENTARY_CHARGE * 1.0e3;

/// Prefactor of the electron-ion collision frequency for temperatures in
/// keV and densities in m^-3, so that
/// `nu = factor * sqrt(2) * n * loge * zeff / T^(3/2)` comes out in s^-1.
///
/// Not a `const` because the expression needs `sqrt`.
pub fn collision_frequency_factor() -> f64 {
    let coulomb = ELEMENTARY_CHARGE / (4.0 * PI * VACUUM_PERMITTIVITY);
    (4.0 * PI.sqrt() / 3.0)
        * coulomb.powi(2)
        * (ELEMENTARY_CHARGE / JOULES_PER_KEV)
        * (ELEMENTARY_CHARGE / ELECTRON_MASS * ELEMENTARY_CHARGE / JOULES_PER_KEV).sqrt()
}
