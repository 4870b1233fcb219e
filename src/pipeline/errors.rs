// mmmrs-inputs/src/pipeline/errors.rs

use crate::gradient::GradientError;
use crate::variables::VariableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Uninitialized field on PipelineBuilder: {0}")]
    UninitializedField(String),
    #[error("variable `{variable}` required by `{formula}` has no values")]
    MissingInput {
        formula: &'static str,
        variable: &'static str,
    },
    #[error("shape mismatch in `{stage}`: `{variable}` is {found:?}, expected {expected:?}")]
    ShapeMismatch {
        stage: &'static str,
        variable: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("boundary grid needs at least 2 radial points, found {0}")]
    DegenerateGrid(usize),
    #[error(transparent)]
    Gradient(#[from] GradientError),
    #[error(transparent)]
    Variable(#[from] VariableError),
}

impl PipelineError {
    /// Pin a bare unpopulated-variable error to the stage that hit it, so
    /// callers always learn both names.
    pub(crate) fn attributed(self, formula: &'static str) -> Self {
        match self {
            PipelineError::Variable(VariableError::Unpopulated(variable)) => {
                PipelineError::MissingInput { formula, variable }
            }
            other => other,
        }
    }
}
