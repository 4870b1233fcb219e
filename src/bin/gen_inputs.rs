use clap::Parser;
use mmmrs_inputs::pipeline::PipelineBuilder;
use mmmrs_inputs::settings::{CoulombLog, PipelineSettings};
use mmmrs_inputs::synthetic::{synthetic_discharge, SyntheticDischargeOpts};
use mmmrs_inputs::variables::{definition, GridRole, Origin, Variables};
use pretty_env_logger;
use std::process::ExitCode;
use std::{error::Error, path::PathBuf};

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Derive the transport-driver input profiles from a synthetic discharge",
    long_about = None,
    version = env!("MMMRS_INPUTS_VERSION")
)]
struct Cli {
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

    /// Time column to summarize and export
    #[clap(long, default_value = "0")]
    time_index: usize,

    /// Write the boundary-grid profiles to a CSV file
    #[clap(short, long)]
    output_filepath: Option<PathBuf>,
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if cli.points < 6 {
        return Err(format!("at least 6 radial points required, got {}", cli.points).into());
    }
    if cli.time_index >= cli.times {
        return Err(format!(
            "time index {} out of range for {} time points",
            cli.time_index, cli.times
        )
        .into());
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

    // Derive the inputs
    let mut builder = PipelineBuilder::default();
    builder.variables(&vars);
    builder.settings(&settings);
    let derived = builder.run()?;

    println!("{:<10} {:>12} {:>12}  {}", "name", "min", "max", "units");
    for (name, variable) in derived.iter() {
        if definition(name).map(|def| def.origin) != Some(Origin::Derived) {
            continue;
        }
        if let Some(values) = &variable.values {
            let column = values.column(cli.time_index);
            let min = column.fold(f64::INFINITY, |a, &b| a.min(b));
            let max = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            println!(
                "{:<10} {:>12.4e} {:>12.4e}  {}",
                name, min, max, display_units(variable.units)
            );
        }
    }

    if let Some(output_path) = &cli.output_filepath {
        write_csv(output_path, &derived, cli.time_index)?;
        println!("Wrote {}", output_path.display());
    }

    Ok(())
}

fn display_units(units: &str) -> &str {
    if units.is_empty() {
        "-"
    } else {
        units
    }
}

/// One column per populated boundary-grid variable, one row per radial
/// point, at the chosen time index.
fn write_csv(
    path: &PathBuf,
    vars: &Variables,
    time_index: usize,
) -> Result<(), Box<dyn Error>> {
    let names: Vec<&str> = vars
        .populated_names()
        .into_iter()
        .filter(|name| definition(name).map(|def| def.grid) == Some(GridRole::Edges))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&names)?;
    let rows = vars.values("xb")?.nrows();
    for i in 0..rows {
        let record: Vec<String> = names
            .iter()
            .map(|name| format!("{:.9e}", vars.values(name).unwrap()[[i, time_index]]))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
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
