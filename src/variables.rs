// mmmrs-inputs/src/variables.rs

use ndarray::Array2;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum VariableError {
    #[error("unknown variable `{0}`")]
    Unknown(String),
    #[error("variable `{0}` has no values")]
    Unpopulated(&'static str),
}

/// Which radial grid a variable lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridRole {
    /// Boundary grid: one point per cell edge, magnetic-axis origin
    /// included.
    Edges,
    /// Cell-center grid: one point fewer than the boundary grid.
    Centers,
}

/// Where a variable's values come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Supplied by the upstream reader/converter.
    Measured,
    /// Computed by the calculation pipeline.
    Derived,
}

/// Static description of one container entry.
#[derive(Clone, Copy, Debug)]
pub struct VariableDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub units: &'static str,
    pub grid: GridRole,
    pub origin: Origin,
    /// Eligible for the smoothing stage of post-processing.
    pub smooth: bool,
    /// Floor applied by post-processing, when declared.
    pub min_value: Option<f64>,
}

const fn coordinate(
    name: &'static str,
    label: &'static str,
    grid: GridRole,
) -> VariableDefinition {
    VariableDefinition {
        name,
        label,
        units: "",
        grid,
        origin: Origin::Measured,
        smooth: false,
        min_value: None,
    }
}

const fn measured(
    name: &'static str,
    label: &'static str,
    units: &'static str,
) -> VariableDefinition {
    VariableDefinition {
        name,
        label,
        units,
        grid: GridRole::Edges,
        origin: Origin::Measured,
        smooth: false,
        min_value: None,
    }
}

const fn derived(
    name: &'static str,
    label: &'static str,
    units: &'static str,
) -> VariableDefinition {
    VariableDefinition {
        name,
        label,
        units,
        grid: GridRole::Edges,
        origin: Origin::Derived,
        smooth: true,
        min_value: None,
    }
}

// Algebraic ratios that are already smooth by construction.
const fn derived_exact(
    name: &'static str,
    label: &'static str,
    units: &'static str,
) -> VariableDefinition {
    VariableDefinition {
        name,
        label,
        units,
        grid: GridRole::Edges,
        origin: Origin::Derived,
        smooth: false,
        min_value: None,
    }
}

const fn derived_floored(
    name: &'static str,
    label: &'static str,
    units: &'static str,
    floor: f64,
) -> VariableDefinition {
    VariableDefinition {
        name,
        label,
        units,
        grid: GridRole::Edges,
        origin: Origin::Derived,
        smooth: true,
        min_value: Some(floor),
    }
}

const fn gradient(name: &'static str, label: &'static str) -> VariableDefinition {
    derived(name, label, "")
}

/// Every variable the engine knows about, in canonical order. Container
/// iteration follows this table.
pub const DEFINITIONS: &[VariableDefinition] = &[
    coordinate("x", "Cell-Center Coordinate", GridRole::Centers),
    coordinate("xb", "Cell-Edge Coordinate", GridRole::Edges),
    measured("te", "Electron Temperature", "keV"),
    measured("ti", "Thermal Ion Temperature", "keV"),
    measured("ne", "Electron Density", "m^-3"),
    measured("nd", "Deuterium Ion Density", "m^-3"),
    measured("nf", "Fast Ion Density", "m^-3"),
    measured("nz", "Impurity Density", "m^-3"),
    measured("zimp", "Mean Impurity Charge", ""),
    measured("aimp", "Mean Impurity Mass", ""),
    measured("arat", "Aspect Ratio", ""),
    measured("rmaj", "Major Radius", "m"),
    measured("rmin", "Minor Radius", "m"),
    measured("bz", "Vacuum Toroidal Field", "T"),
    measured("q", "Safety Factor", ""),
    measured("elong", "Elongation", ""),
    measured("omega", "Toroidal Angular Velocity", "rad/s"),
    measured("vpolavg", "Avg Poloidal Velocity", "m/s"),
    measured("vpold", "Deuterium Poloidal Velocity", "m/s"),
    measured("vpolh", "Hydrogen Poloidal Velocity", "m/s"),
    derived("vpol", "Poloidal Velocity", "m/s"),
    derived_floored("nh0", "Hydrogen Ion Density", "m^-3", 1e-6),
    derived_floored("nh", "Total Hydrogenic Ion Density", "m^-3", 1e-6),
    derived_floored("ni", "Thermal Ion Density", "m^-3", 1e-6),
    derived_exact("ahyd", "Mean Hydrogenic Mass", ""),
    derived_exact("aimass", "Mean Thermal Ion Mass", ""),
    derived_exact("rho", "Normalized Minor Radius", ""),
    derived("tau", "Temperature Ratio", ""),
    derived("btor", "Toroidal Magnetic Field", "T"),
    derived("bpol", "Poloidal Magnetic Field", "T"),
    derived("vtor", "Toroidal Velocity", "m/s"),
    derived("vpar", "Parallel Velocity", "m/s"),
    derived("zeff", "Effective Charge", ""),
    derived_exact("eps", "Inverse Aspect Ratio", ""),
    derived("p", "Plasma Pressure", "Pa"),
    derived("beta", "Plasma Beta", ""),
    derived("betae", "Electron Beta", ""),
    derived("loge", "Coulomb Logarithm", ""),
    derived("nuei", "Electron Collision Frequency", "s^-1"),
    derived("nuei2", "Ion Collision Frequency", "s^-1"),
    derived("vthe", "Electron Thermal Velocity", "m/s"),
    derived("vthi", "Ion Thermal Velocity", "m/s"),
    derived("nuste", "Electron Collisionality", ""),
    derived("nusti", "Ion Collisionality", ""),
    derived("gyrfi", "Ion Gyrofrequency", "s^-1"),
    derived("gmax", "Maximum Gradient", ""),
    gradient("gne", "Electron Density Gradient"),
    gradient("gnh", "Hydrogenic Density Gradient"),
    gradient("gni", "Thermal Ion Density Gradient"),
    gradient("gnz", "Impurity Density Gradient"),
    gradient("gnd", "Deuterium Density Gradient"),
    gradient("gq", "Safety Factor Gradient"),
    gradient("gte", "Electron Temperature Gradient"),
    gradient("gti", "Ion Temperature Gradient"),
    gradient("gvpar", "Parallel Velocity Gradient"),
    gradient("gvpol", "Poloidal Velocity Gradient"),
    gradient("gvtor", "Toroidal Velocity Gradient"),
    derived("shear", "Magnetic Shear", ""),
    derived_floored("shat", "Effective Magnetic Shear", "", 0.0),
    derived("alphamhd", "MHD Alpha", ""),
    derived("gave", "Average Curvature", ""),
    derived("etae", "eta_e", ""),
    derived("etai", "eta_i", ""),
    derived("etaie", "eta_ie", ""),
    derived("etaih", "eta_ih", ""),
    derived("etaid", "eta_id", ""),
    derived("test", "Self-Test Sum", ""),
    gradient("gtest", "Self-Test Gradient"),
    derived("test2", "Self-Test Ratio", ""),
];

/// Look up the static definition of a variable.
pub fn definition(name: &str) -> Option<&'static VariableDefinition> {
    DEFINITIONS.iter().find(|def| def.name == name)
}

/// One profile: optional 2-D values (radial point, time point) plus the
/// display and post-processing metadata from its definition.
#[derive(Clone, Debug)]
pub struct Variable {
    pub values: Option<Array2<f64>>,
    pub units: &'static str,
    pub label: &'static str,
    pub smooth: bool,
    pub min_value: Option<f64>,
}

impl Variable {
    fn new(def: &VariableDefinition) -> Self {
        Self {
            values: None,
            units: def.units,
            label: def.label,
            smooth: def.smooth,
            min_value: def.min_value,
        }
    }
}

/// The variable container: every known name, populated or not.
///
/// `Clone` performs a deep copy of all value arrays; a pipeline run clones
/// the caller's container and never writes through to it.
#[derive(Clone, Debug)]
pub struct Variables {
    map: HashMap<&'static str, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        let map = DEFINITIONS
            .iter()
            .map(|def| (def.name, Variable::new(def)))
            .collect();
        Self { map }
    }

    pub fn get(&self, name: &str) -> Result<&Variable, VariableError> {
        self.map
            .get(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Variable, VariableError> {
        self.map
            .get_mut(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))
    }

    /// The values of a populated variable.
    pub fn values(&self, name: &str) -> Result<&Array2<f64>, VariableError> {
        let (key, variable) = self
            .map
            .get_key_value(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))?;
        variable.values.as_ref().ok_or(VariableError::Unpopulated(key))
    }

    /// The values of a variable, `None` when unknown or unpopulated.
    pub fn try_values(&self, name: &str) -> Option<&Array2<f64>> {
        self.map.get(name).and_then(|v| v.values.as_ref())
    }

    pub fn set_values(&mut self, name: &str, values: Array2<f64>) -> Result<(), VariableError> {
        self.get_mut(name)?.values = Some(values);
        Ok(())
    }

    pub fn is_populated(&self, name: &str) -> bool {
        self.try_values(name).is_some()
    }

    /// Entries in definition-table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Variable)> + '_ {
        DEFINITIONS.iter().map(move |def| {
            (
                def.name,
                self.map.get(def.name).expect("definition table is complete"),
            )
        })
    }

    /// Names of populated entries, in definition-table order.
    pub fn populated_names(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, v)| v.values.is_some())
            .map(|(name, _)| name)
            .collect()
    }
}

impl Default for Variables {
    fn default() -> Self {
        Self::new()
    }
}
