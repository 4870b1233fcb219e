use clap::Parser;
use mmmrs_inputs::scan::run_variable_scan;
use mmmrs_inputs::settings::{CoulombLog, PipelineSettings};
use mmmrs_inputs::synthetic::{synthetic_discharge, SyntheticDischargeOpts};
use mmmrs_inputs::variables::definition;
use pretty_env_logger;
use std::error::Error;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Re-derive the driver inputs while scaling one measured variable",
    long_about = None,
    version = env!("MMMRS_INPUTS_VERSION")
)]
struct Cli {
    /// Measured variable to scan (e.g. "te", "ne", "q")
    variable: String,

    /// Scan factors (space-separated, e.g. "0.8 1.0 1.2")
    #[clap(short, long, value_delimiter = ' ', num_args = 1.., required = true)]
    factors: Vec<f64>,

    /// Number of boundary-grid radial points
    #[clap(short, long, default_value = "51")]
    points: usize,

    /// Number of time points
    #[clap(short, long, default_value = "1")]
    times: usize,

    /// Disable profile smoothing
    #[clap(long, action)]
    no_smoothing: bool,

    /// Keep statistical outliers instead of rejecting them
    #[clap(long, action)]
    keep_outliers: bool,

    /// Coulomb-logarithm convention
    #[clap(short, long, default_value = "nrl")]
    coulomb_log: CoulombLog,

    /// Populate a measured poloidal-velocity profile
    #[clap(long, action)]
    measured_vpol: bool,

    /// Variables to report at mid-radius for each factor
    #[clap(short, long, value_delimiter = ' ', num_args = 1.., default_value = "gte gti zeff")]
    report: Vec<String>,
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if cli.points < 6 {
        return Err(format!("at least 6 radial points required, got {}", cli.points).into());
    }
    for name in &cli.report {
        if definition(name).is_none() {
            return Err(format!("unknown report variable `{}`", name).into());
        }
    }

    let opts = SyntheticDischargeOpts {
        points: cli.points,
        times: cli.times,
        measured_vpol: cli.measured_vpol,
    };
    let vars = synthetic_discharge(&opts);

    let settings = PipelineSettings {
        apply_smoothing: !cli.no_smoothing,
        input_points: cli.points,
        reject_outliers: !cli.keep_outliers,
        coulomb_log: cli.coulomb_log,
    };

    // Run the scan
    let results = run_variable_scan(&vars, &cli.variable, &cli.factors, &settings)?;

    for result in &results {
        print!("factor {:>6.3}:", result.factor);
        for name in &cli.report {
            let values = result.variables.values(name)?;
            let mid = values[[values.nrows() / 2, 0]];
            print!("  {}={:+.4e}", name, mid);
        }
        println!();
    }

    Ok(())
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
