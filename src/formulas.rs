// mmmrs-inputs/src/formulas.rs
//
// One function per derived quantity, each reading previously populated
// container entries and returning a fresh array. The registries at the
// bottom pin the execution order; it is a hand-verified topological sort of
// the dependency declarations, and `test_execution_order_satisfies_dependencies`
// re-verifies it on every change.

use crate::constants::{
    collision_frequency_factor, ELECTRON_MASS, ELEMENTARY_CHARGE, JOULES_PER_KEV, PROTON_MASS,
    VACUUM_PERMEABILITY,
};
use crate::gradient::{GradientSign, GradientSpec};
use crate::pipeline::PipelineError;
use crate::settings::{CoulombLog, PipelineSettings};
use crate::variables::Variables;
use ndarray::{Array2, Axis, Zip};
use std::f64::consts::SQRT_2;

type Compute = fn(&Variables, &PipelineSettings) -> Result<Array2<f64>, PipelineError>;

/// One derived-variable calculation and its declared inputs.
pub struct Formula {
    pub name: &'static str,
    pub depends_on: &'static [&'static str],
    pub compute: Compute,
}

/// Names with this prefix exercise the machinery end to end and stay out
/// of the discovery list.
pub const SELF_TEST_PREFIX: &str = "test";

/// Measured poloidal-velocity candidates, best first.
pub const VPOL_SOURCES: [&'static str; 3] = ["vpolavg", "vpold", "vpolh"];

/// First populated poloidal-velocity source, or zeros on the boundary grid
/// when no diagnostic supplied one.
fn vpol(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    for name in VPOL_SOURCES {
        if let Some(values) = vars.try_values(name) {
            return Ok(values.clone());
        }
    }
    Ok(Array2::zeros(vars.values("xb")?.raw_dim()))
}

/// Hydrogen ion density from quasi-neutrality: electrons minus impurity,
/// fast, and deuterium charge.
fn nh0(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ne = vars.values("ne")?;
    let nz = vars.values("nz")?;
    let nf = vars.values("nf")?;
    let nd = vars.values("nd")?;
    let zimp = vars.values("zimp")?;
    Ok(ne - &(zimp * nz) - nf - nd)
}

fn nh(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("nh0")? + vars.values("nd")?)
}

fn ni(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("nd")? + vars.values("nz")? + vars.values("nh0")?)
}

/// Mean hydrogenic mass in proton masses (hydrogen at 1, deuterium at 2).
fn ahyd(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let nh0 = vars.values("nh0")?;
    let nd = vars.values("nd")?;
    Ok(Zip::from(nh0)
        .and(nd)
        .map_collect(|&h, &d| (h + 2.0 * d) / (h + d)))
}

fn aimass(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ahyd = vars.values("ahyd")?;
    let aimp = vars.values("aimp")?;
    let nh = vars.values("nh")?;
    let nz = vars.values("nz")?;
    Ok(Zip::from(ahyd)
        .and(aimp)
        .and(nh)
        .and(nz)
        .map_collect(|&ah, &ai, &h, &z| (ah * h + ai * z) / (h + z)))
}

/// Minor radius normalized to its outermost boundary value.
fn rho(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let rmin = vars.values("rmin")?;
    let edge = rmin.row(rmin.nrows() - 1).insert_axis(Axis(0)).to_owned();
    Ok(rmin / &edge)
}

fn tau(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("te")? / vars.values("ti")?)
}

/// Toroidal field scaled from the vacuum value at the magnetic axis (the
/// first boundary row).
fn btor(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let rmaj = vars.values("rmaj")?;
    let bz = vars.values("bz")?;
    let axis_row = rmaj.row(0).insert_axis(Axis(0)).to_owned();
    Ok(&(bz * &axis_row) / rmaj)
}

fn bpol(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let rmin = vars.values("rmin")?;
    let rmaj = vars.values("rmaj")?;
    let btor = vars.values("btor")?;
    let q = vars.values("q")?;
    Ok(Zip::from(rmin)
        .and(rmaj)
        .and(btor)
        .and(q)
        .map_collect(|&rm, &rj, &b, &sf| rm / rj * b / sf))
}

fn vtor(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("rmaj")? * vars.values("omega")?)
}

fn vpar(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let vtor = vars.values("vtor")?;
    let vpol = vars.values("vpol")?;
    let bpol = vars.values("bpol")?;
    let btor = vars.values("btor")?;
    Ok(Zip::from(vtor)
        .and(vpol)
        .and(bpol)
        .and(btor)
        .map_collect(|&vt, &vp, &bp, &bt| vt + vp * bp / bt))
}

fn zeff(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let nh = vars.values("nh")?;
    let nf = vars.values("nf")?;
    let zimp = vars.values("zimp")?;
    let nz = vars.values("nz")?;
    let ne = vars.values("ne")?;
    Ok(Zip::from(nh)
        .and(nf)
        .and(zimp)
        .and(nz)
        .and(ne)
        .map_collect(|&h, &f, &zi, &z, &e| (h + f + zi * zi * z) / e))
}

fn eps(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("arat")?.mapv(|a| 1.0 / a))
}

/// Total thermal pressure \[Pa\] for temperatures in keV.
fn p(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ne = vars.values("ne")?;
    let te = vars.values("te")?;
    let ni = vars.values("ni")?;
    let ti = vars.values("ti")?;
    Ok(Zip::from(ne)
        .and(te)
        .and(ni)
        .and(ti)
        .map_collect(|&n_e, &t_e, &n_i, &t_i| (n_e * t_e + n_i * t_i) * JOULES_PER_KEV))
}

fn beta(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let p = vars.values("p")?;
    let btor = vars.values("btor")?;
    Ok(Zip::from(p)
        .and(btor)
        .map_collect(|&pr, &b| 2.0 * VACUUM_PERMEABILITY * pr / (b * b)))
}

fn betae(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ne = vars.values("ne")?;
    let te = vars.values("te")?;
    let btor = vars.values("btor")?;
    Ok(Zip::from(ne).and(te).and(btor).map_collect(|&n, &t, &b| {
        2.0 * VACUUM_PERMEABILITY * n * t * JOULES_PER_KEV / (b * b)
    }))
}

/// Electron-ion Coulomb logarithm. The NRL formulary expression is the
/// default; the TRANSP convention folds the effective charge into the
/// logarithm and shifts the constant.
fn loge(vars: &Variables, settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ne = vars.values("ne")?;
    let te = vars.values("te")?;
    match settings.coulomb_log {
        CoulombLog::Nrl => Ok(Zip::from(ne)
            .and(te)
            .map_collect(|&n, &t| 37.8 - (n.sqrt() / t).ln())),
        CoulombLog::Transp => {
            let zeff = vars.values("zeff")?;
            Ok(Zip::from(ne)
                .and(te)
                .and(zeff)
                .map_collect(|&n, &t, &z| 39.23 - (z * n.sqrt() / t).ln()))
        }
    }
}

fn nuei(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ne = vars.values("ne")?;
    let loge = vars.values("loge")?;
    let zeff = vars.values("zeff")?;
    let te = vars.values("te")?;
    let factor = collision_frequency_factor() * SQRT_2;
    Ok(Zip::from(ne)
        .and(loge)
        .and(zeff)
        .and(te)
        .map_collect(|&n, &l, &z, &t| factor * n * l * z / t.powf(1.5)))
}

/// Ion collision frequency, same prefactor as `nuei` over the thermal ion
/// population.
fn nuei2(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ni = vars.values("ni")?;
    let loge = vars.values("loge")?;
    let zeff = vars.values("zeff")?;
    let ti = vars.values("ti")?;
    let factor = collision_frequency_factor() * SQRT_2;
    Ok(Zip::from(ni)
        .and(loge)
        .and(zeff)
        .and(ti)
        .map_collect(|&n, &l, &z, &t| factor * n * l * z / t.powf(1.5)))
}

fn vthe(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars
        .values("te")?
        .mapv(|t| (2.0 * JOULES_PER_KEV * t / ELECTRON_MASS).sqrt()))
}

fn vthi(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let ti = vars.values("ti")?;
    let aimass = vars.values("aimass")?;
    Ok(Zip::from(ti)
        .and(aimass)
        .map_collect(|&t, &a| (JOULES_PER_KEV * t / (PROTON_MASS * a)).sqrt()))
}

/// Electron collisionality. The inverse-aspect-ratio power blows up at the
/// magnetic axis where `eps` vanishes; post-processing repairs those
/// entries.
fn nuste(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let nuei = vars.values("nuei")?;
    let eps = vars.values("eps")?;
    let q = vars.values("q")?;
    let rmaj = vars.values("rmaj")?;
    let vthe = vars.values("vthe")?;
    Ok(Zip::from(nuei)
        .and(eps)
        .and(q)
        .and(rmaj)
        .and(vthe)
        .map_collect(|&nu, &e, &sf, &r, &v| nu * e.powf(-1.5) * sf * r / v))
}

fn nusti(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let nuei2 = vars.values("nuei2")?;
    let eps = vars.values("eps")?;
    let q = vars.values("q")?;
    let rmaj = vars.values("rmaj")?;
    let vthi = vars.values("vthi")?;
    let mass_ratio = (ELECTRON_MASS / PROTON_MASS).sqrt();
    Ok(Zip::from(nuei2)
        .and(eps)
        .and(q)
        .and(rmaj)
        .and(vthi)
        .map_collect(|&nu, &e, &sf, &r, &v| nu * e.powf(-1.5) * sf * r / (2.0 * v) * mass_ratio))
}

fn gyrfi(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let btor = vars.values("btor")?;
    let aimass = vars.values("aimass")?;
    Ok(Zip::from(btor)
        .and(aimass)
        .map_collect(|&b, &a| ELEMENTARY_CHARGE * b / (PROTON_MASS * a)))
}

/// Upper bound used when scanning gradients in the driver.
fn gmax(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let rmaj = vars.values("rmaj")?;
    let vthi = vars.values("vthi")?;
    let gyrfi = vars.values("gyrfi")?;
    let q = vars.values("q")?;
    let eps = vars.values("eps")?;
    Ok(Zip::from(rmaj)
        .and(vthi)
        .and(gyrfi)
        .and(q)
        .and(eps)
        .map_collect(|&r, &v, &gf, &sf, &e| r / (v / gf * sf / e)))
}

fn shear(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let gq = vars.values("gq")?;
    let rmin = vars.values("rmin")?;
    let rmaj = vars.values("rmaj")?;
    Ok(Zip::from(gq)
        .and(rmin)
        .and(rmaj)
        .map_collect(|&g, &rm, &rj| g * rm / rj))
}

/// Effective shear including elongation. A negative radicand goes NaN here
/// and is healed by the non-finite repair stage; the explicit comparison
/// keeps NaN out of the floor.
fn shat(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let shear = vars.values("shear")?;
    let elong = vars.values("elong")?;
    Ok(Zip::from(shear).and(elong).map_collect(|&s, &k| {
        let value = (2.0 * s - 1.0 + (k * (s - 1.0)).powi(2)).sqrt();
        if value < 0.0 {
            0.0
        } else {
            value
        }
    }))
}

fn alphamhd(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let q = vars.values("q")?;
    let betae = vars.values("betae")?;
    let gne = vars.values("gne")?;
    let gte = vars.values("gte")?;
    let gni = vars.values("gni")?;
    let gti = vars.values("gti")?;
    let ti = vars.values("ti")?;
    let te = vars.values("te")?;
    let kinetic = (gne + gte) + (ti / te) * (gni + gti);
    Ok(Zip::from(q)
        .and(betae)
        .and(&kinetic)
        .map_collect(|&sf, &b, &k| sf * sf * b * k))
}

fn gave(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    let shear = vars.values("shear")?;
    let alphamhd = vars.values("alphamhd")?;
    Ok(Zip::from(shear)
        .and(alphamhd)
        .map_collect(|&s, &a| 2.0 / 3.0 + 5.0 / 9.0 * s - 5.0 / 12.0 * a))
}

fn ratio(
    vars: &Variables,
    numerator: &'static str,
    denominator: &'static str,
) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values(numerator)? / vars.values(denominator)?)
}

fn etae(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gte", "gne")
}

fn etai(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gti", "gni")
}

fn etaie(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gti", "gne")
}

fn etaih(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gti", "gnh")
}

fn etaid(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gti", "gnd")
}

fn test_sum(vars: &Variables, _settings: &PipelineSettings) -> Result<Array2<f64>, PipelineError> {
    Ok(vars.values("nh")? + vars.values("nd")?)
}

fn test_ratio(
    vars: &Variables,
    _settings: &PipelineSettings,
) -> Result<Array2<f64>, PipelineError> {
    ratio(vars, "gti", "gtest")
}

/// Formulas executed before any gradient exists. Later entries consume
/// earlier results.
pub const PRE_GRADIENT_FORMULAS: &[Formula] = &[
    Formula { name: "vpol", depends_on: &["xb"], compute: vpol },
    Formula { name: "nh0", depends_on: &["ne", "nz", "zimp", "nf", "nd"], compute: nh0 },
    Formula { name: "nh", depends_on: &["nh0", "nd"], compute: nh },
    Formula { name: "ni", depends_on: &["nd", "nz", "nh0"], compute: ni },
    Formula { name: "ahyd", depends_on: &["nh0", "nd"], compute: ahyd },
    Formula { name: "aimass", depends_on: &["ahyd", "aimp", "nh", "nz"], compute: aimass },
    Formula { name: "rho", depends_on: &["rmin"], compute: rho },
    Formula { name: "tau", depends_on: &["te", "ti"], compute: tau },
    Formula { name: "btor", depends_on: &["rmaj", "bz"], compute: btor },
    Formula { name: "bpol", depends_on: &["rmin", "rmaj", "btor", "q"], compute: bpol },
    Formula { name: "vtor", depends_on: &["rmaj", "omega"], compute: vtor },
    Formula { name: "vpar", depends_on: &["vtor", "vpol", "bpol", "btor"], compute: vpar },
    Formula { name: "zeff", depends_on: &["nh", "nf", "zimp", "nz", "ne"], compute: zeff },
    Formula { name: "eps", depends_on: &["arat"], compute: eps },
    Formula { name: "p", depends_on: &["ne", "te", "ni", "ti"], compute: p },
    Formula { name: "beta", depends_on: &["p", "btor"], compute: beta },
    Formula { name: "betae", depends_on: &["ne", "te", "btor"], compute: betae },
    Formula { name: "loge", depends_on: &["ne", "te", "zeff"], compute: loge },
    Formula { name: "nuei", depends_on: &["ne", "loge", "zeff", "te"], compute: nuei },
    Formula { name: "nuei2", depends_on: &["ni", "loge", "zeff", "ti"], compute: nuei2 },
    Formula { name: "vthe", depends_on: &["te"], compute: vthe },
    Formula { name: "vthi", depends_on: &["ti", "aimass"], compute: vthi },
    Formula { name: "nuste", depends_on: &["nuei", "eps", "q", "rmaj", "vthe"], compute: nuste },
    Formula { name: "nusti", depends_on: &["nuei2", "eps", "q", "rmaj", "vthi"], compute: nusti },
    Formula { name: "gyrfi", depends_on: &["btor", "aimass"], compute: gyrfi },
    Formula { name: "gmax", depends_on: &["rmaj", "vthi", "gyrfi", "q", "eps"], compute: gmax },
];

/// The production gradients, computed once the pre-gradient formulas have
/// run. Gradients never depend on each other.
pub const GRADIENT_SPECS: &[GradientSpec] = &[
    GradientSpec { name: "gne", source: "ne", sign: GradientSign::Negative },
    GradientSpec { name: "gnh", source: "nh", sign: GradientSign::Negative },
    GradientSpec { name: "gni", source: "ni", sign: GradientSign::Negative },
    GradientSpec { name: "gnz", source: "nz", sign: GradientSign::Negative },
    GradientSpec { name: "gnd", source: "nd", sign: GradientSign::Negative },
    GradientSpec { name: "gq", source: "q", sign: GradientSign::Positive },
    GradientSpec { name: "gte", source: "te", sign: GradientSign::Negative },
    GradientSpec { name: "gti", source: "ti", sign: GradientSign::Negative },
    GradientSpec { name: "gvpar", source: "vpar", sign: GradientSign::Negative },
    GradientSpec { name: "gvpol", source: "vpol", sign: GradientSign::Negative },
    GradientSpec { name: "gvtor", source: "vtor", sign: GradientSign::Negative },
];

/// Formulas that consume gradients.
pub const POST_GRADIENT_FORMULAS: &[Formula] = &[
    Formula { name: "shear", depends_on: &["gq", "rmin", "rmaj"], compute: shear },
    Formula { name: "shat", depends_on: &["shear", "elong"], compute: shat },
    Formula {
        name: "alphamhd",
        depends_on: &["q", "betae", "gne", "gte", "gni", "gti", "ti", "te"],
        compute: alphamhd,
    },
    Formula { name: "gave", depends_on: &["shear", "alphamhd"], compute: gave },
    Formula { name: "etae", depends_on: &["gte", "gne"], compute: etae },
    Formula { name: "etai", depends_on: &["gti", "gni"], compute: etai },
    Formula { name: "etaie", depends_on: &["gti", "gne"], compute: etaie },
    Formula { name: "etaih", depends_on: &["gti", "gnh"], compute: etaih },
    Formula { name: "etaid", depends_on: &["gti", "gnd"], compute: etaid },
];

/// End-to-end machinery checks, always executed last: a sum, its gradient,
/// and a gradient ratio.
pub const SELF_TEST_FORMULAS: &[Formula] = &[
    Formula { name: "test", depends_on: &["nh", "nd"], compute: test_sum },
    Formula { name: "test2", depends_on: &["gti", "gtest"], compute: test_ratio },
];

pub const SELF_TEST_GRADIENTS: &[GradientSpec] = &[GradientSpec {
    name: "gtest",
    source: "test",
    sign: GradientSign::Negative,
}];

/// Names of the calculated variables proper, for downstream comparison
/// tooling: every formula result except the self-test entries. Gradients
/// are enumerated separately through the gradient specs.
pub fn calculated_variable_names() -> Vec<&'static str> {
    PRE_GRADIENT_FORMULAS
        .iter()
        .chain(POST_GRADIENT_FORMULAS)
        .chain(SELF_TEST_FORMULAS)
        .filter(|formula| !formula.name.starts_with(SELF_TEST_PREFIX))
        .map(|formula| formula.name)
        .collect()
}
