//! Entry point for the tdf_fire application.
//! Handles CLI parsing and logging setup, then dispatches pipeline stages.

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::error::Error;
use std::process::ExitCode;

mod cli;

use cli::{Args, Command};
use tdf_fire::datasets::DatasetKind;
use tdf_fire::metadata::describe_raster;
use tdf_fire::parallel::{parallel_info, ParallelConfig};
use tdf_fire::pipeline::{build_datasets, run_all, Stage};
use tdf_fire::PipelineConfig;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("❌ Could not initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = &args.data_root {
        config.data_root = root.clone();
    }
    if args.overwrite {
        config.skip_existing = false;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    ParallelConfig::new(args.threads).setup_global_pool()?;
    parallel_info().log();

    let config = load_config(&args)?;
    log::debug!("Data root: {}", config.data_root.display());

    match args.command {
        Command::GroupFires => report(Stage::GroupFires.run(&config)?),
        Command::ReclassLandcover => report(Stage::ReclassLandcover.run(&config)?),
        Command::ExtractPrecipitation => report(Stage::ExtractPrecipitation.run(&config)?),
        Command::Resample => report(Stage::Resample.run(&config)?),
        Command::Mask => report(Stage::Mask.run(&config)?),
        Command::Proximity => report(Stage::ForestProximity.run(&config)?),
        Command::Dataset { name } => {
            let kinds = if name == "all" {
                DatasetKind::ALL.to_vec()
            } else {
                vec![name.parse::<DatasetKind>()?]
            };
            report(build_datasets(&config, &kinds)?);
        }
        Command::Describe { file } => println!("{}", describe_raster(&file)?),
        Command::RunAll => report(run_all(&config)?),
    }
    Ok(())
}

fn report(written: usize) {
    log::info!("✅ Done ({} outputs written)", written);
}
