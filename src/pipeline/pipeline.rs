// mmmrs-inputs/src/pipeline/pipeline.rs

use super::errors::PipelineError;
use crate::formulas::{
    Formula, GRADIENT_SPECS, POST_GRADIENT_FORMULAS, PRE_GRADIENT_FORMULAS, SELF_TEST_FORMULAS,
    SELF_TEST_GRADIENTS,
};
use crate::gradient::{normalized_gradient, radial_spacing, GradientSpec};
use crate::postprocess::{finalize_gradient, finalize_variable};
use crate::settings::PipelineSettings;
use crate::variables::{GridRole, Variable, Variables, DEFINITIONS};
use humantime::format_duration;
use log::{debug, info, trace};
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;
use std::time::Instant;

#[derive(Default)]
pub struct PipelineBuilder<'a> {
    variables: Option<&'a Variables>,
    settings: Option<&'a PipelineSettings>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn variables(&mut self, variables: &'a Variables) -> &mut Self {
        self.variables = Some(variables);
        self
    }

    pub fn settings(&mut self, settings: &'a PipelineSettings) -> &mut Self {
        self.settings = Some(settings);
        self
    }

    /// Derive every calculated variable and gradient, returning a fully
    /// populated copy of the input container. The caller's container is
    /// never written to.
    pub fn run(&self) -> Result<Variables, PipelineError> {
        let variables = self
            .variables
            .ok_or_else(|| PipelineError::UninitializedField("variables".to_string()))?;
        let settings = self
            .settings
            .ok_or_else(|| PipelineError::UninitializedField("settings".to_string()))?;

        info!("Starting input derivation");
        let run_start = Instant::now();

        let mut vars = variables.clone();
        let grid = validate_container(&vars)?;
        debug!("Grid: {} boundary points, {} time points", grid.0, grid.1);

        for formula in PRE_GRADIENT_FORMULAS {
            execute_formula(formula, &mut vars, settings, grid)?;
        }

        let drmin = radial_spacing(
            vars.values("rmin")
                .map_err(|e| PipelineError::from(e).attributed("gradients"))?,
        );
        let x = axis_profile(&vars, "x")?;
        let xb = axis_profile(&vars, "xb")?;

        for spec in GRADIENT_SPECS {
            execute_gradient(spec, &drmin, &x, &xb, &mut vars, settings, grid)?;
        }

        for formula in POST_GRADIENT_FORMULAS {
            execute_formula(formula, &mut vars, settings, grid)?;
        }

        // Machinery self-checks run last: a sum, its gradient, and their
        // ratio.
        execute_formula(&SELF_TEST_FORMULAS[0], &mut vars, settings, grid)?;
        for spec in SELF_TEST_GRADIENTS {
            execute_gradient(spec, &drmin, &x, &xb, &mut vars, settings, grid)?;
        }
        execute_formula(&SELF_TEST_FORMULAS[1], &mut vars, settings, grid)?;

        info!(
            "Input derivation completed in {}",
            format_duration(run_start.elapsed())
        );
        Ok(vars)
    }
}

/// Check every populated entry against the grid implied by `xb` and hand
/// back that grid. Later stages only re-check what they freshly compute.
fn validate_container(vars: &Variables) -> Result<(usize, usize), PipelineError> {
    let (n_edges, n_time) = vars
        .values("xb")
        .map_err(|e| PipelineError::from(e).attributed("grid"))?
        .dim();
    if n_edges < 2 {
        return Err(PipelineError::DegenerateGrid(n_edges));
    }
    for def in DEFINITIONS {
        if let Some(values) = vars.try_values(def.name) {
            let expected = match def.grid {
                GridRole::Edges => (n_edges, n_time),
                GridRole::Centers => (n_edges - 1, n_time),
            };
            if values.dim() != expected {
                return Err(PipelineError::ShapeMismatch {
                    stage: "grid",
                    variable: def.name,
                    expected,
                    found: values.dim(),
                });
            }
        }
    }
    Ok((n_edges, n_time))
}

/// Radial coordinate profile shared by all time points (column 0).
fn axis_profile(vars: &Variables, name: &'static str) -> Result<Array1<f64>, PipelineError> {
    let values = vars
        .values(name)
        .map_err(|e| PipelineError::from(e).attributed("gradients"))?;
    Ok(values.column(0).to_owned())
}

fn execute_formula(
    formula: &Formula,
    vars: &mut Variables,
    settings: &PipelineSettings,
    grid: (usize, usize),
) -> Result<(), PipelineError> {
    for &dep in formula.depends_on {
        if !vars.is_populated(dep) {
            return Err(PipelineError::MissingInput {
                formula: formula.name,
                variable: dep,
            });
        }
    }

    trace!("computing {}", formula.name);
    let values = (formula.compute)(vars, settings).map_err(|e| e.attributed(formula.name))?;
    if values.dim() != grid {
        return Err(PipelineError::ShapeMismatch {
            stage: formula.name,
            variable: formula.name,
            expected: grid,
            found: values.dim(),
        });
    }

    let variable = vars.get_mut(formula.name)?;
    variable.values = Some(values);
    finalize_variable(formula.name, variable, settings);
    log_range(formula.name, variable);
    Ok(())
}

fn execute_gradient(
    spec: &GradientSpec,
    drmin: &Array2<f64>,
    x: &Array1<f64>,
    xb: &Array1<f64>,
    vars: &mut Variables,
    settings: &PipelineSettings,
    grid: (usize, usize),
) -> Result<(), PipelineError> {
    for dep in [spec.source, "rmaj"] {
        if !vars.is_populated(dep) {
            return Err(PipelineError::MissingInput {
                formula: spec.name,
                variable: dep,
            });
        }
    }

    trace!("computing {}", spec.name);
    let values = {
        let source = vars.values(spec.source)?;
        let rmaj = vars.values("rmaj")?;
        normalized_gradient(spec.name, source, drmin, x, xb, rmaj, spec.sign)?
    };
    if values.dim() != grid {
        return Err(PipelineError::ShapeMismatch {
            stage: spec.name,
            variable: spec.name,
            expected: grid,
            found: values.dim(),
        });
    }

    let variable = vars.get_mut(spec.name)?;
    variable.values = Some(values);
    finalize_gradient(spec.name, variable, settings);
    log_range(spec.name, variable);
    Ok(())
}

fn log_range(name: &str, variable: &Variable) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    if let Some(values) = &variable.values {
        if let (Ok(min), Ok(max)) = (values.min(), values.max()) {
            debug!("{}: range [{:.4e}, {:.4e}]", name, min, max);
        }
    }
}
