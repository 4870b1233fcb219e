// mmmrs-inputs/src/scan.rs

use crate::pipeline::{PipelineBuilder, PipelineError};
use crate::settings::PipelineSettings;
use crate::variables::{definition, Origin, VariableError, Variables};
use log::{debug, info};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("unknown scan variable `{0}`")]
    UnknownVariable(String),
    #[error("`{0}` is calculated by the pipeline; scans only perturb measured variables")]
    NotAMeasuredVariable(String),
    #[error("scan variable `{0}` has no values")]
    Unpopulated(String),
    #[error("scan factor list is empty")]
    EmptyScanRange,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Variable(#[from] VariableError),
}

/// One pipeline result per scan factor.
#[derive(Debug)]
pub struct ScanResult {
    pub factor: f64,
    pub variables: Variables,
}

/// Scale `variable` by each factor and re-run the whole pipeline: one
/// independent run per factor, each on its own deep copy with its own
/// settings snapshot, in parallel. Results come back in factor order; the
/// base container is never touched.
///
/// Only measured variables can be scanned. A calculated target would just
/// be overwritten by the re-run, so it is rejected outright.
pub fn run_variable_scan(
    base: &Variables,
    variable: &str,
    factors: &[f64],
    settings: &PipelineSettings,
) -> Result<Vec<ScanResult>, ScanError> {
    if factors.is_empty() {
        return Err(ScanError::EmptyScanRange);
    }
    let def =
        definition(variable).ok_or_else(|| ScanError::UnknownVariable(variable.to_string()))?;
    if def.origin != Origin::Measured {
        return Err(ScanError::NotAMeasuredVariable(variable.to_string()));
    }
    if !base.is_populated(def.name) {
        return Err(ScanError::Unpopulated(variable.to_string()));
    }

    info!("Scanning `{}` over {} factors", def.name, factors.len());

    factors
        .par_iter()
        .map(|&factor| {
            let mut adjusted = base.clone();
            let snapshot = settings.clone();
            if let Some(values) = adjusted.get_mut(def.name)?.values.as_mut() {
                values.mapv_inplace(|v| v * factor);
            }
            debug!("factor {:.3}: running pipeline", factor);
            let mut builder = PipelineBuilder::default();
            builder.variables(&adjusted);
            builder.settings(&snapshot);
            let variables = builder.run()?;
            Ok(ScanResult { factor, variables })
        })
        .collect()
}
