use pretty_env_logger;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn _setup_pretty_env_logger_default() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}

pub use pipeline::{PipelineBuilder, PipelineError};
pub use scan::{run_variable_scan, ScanError, ScanResult};
pub mod constants;
pub mod formulas;
pub mod gradient;
pub mod pipeline;
pub mod postprocess;
pub mod scan;
pub mod settings;
pub mod synthetic;
pub mod variables;
