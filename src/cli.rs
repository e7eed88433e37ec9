//! Defines command-line interface options using `clap` for the tdf_fire application.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Raster-to-table pipeline for wildfire drivers in the Colombian tropical dry forest
#[derive(Parser, Debug)]
#[command(
    version,
    name = "tdf_fire",
    about = "Prepare MODIS/TRMM rasters and build wildfire analysis tables"
)]
pub struct Args {
    /// JSON configuration file; unset fields keep their defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory the configured product paths are relative to
    #[arg(short, long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to Rayon's own sizing
    /// (`RAYON_NUM_THREADS`, otherwise one thread per logical CPU).
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Recompute outputs that already exist
    #[arg(long, default_value_t = false, global = true)]
    pub overwrite: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sum 8-day fire composites into monthly fire counts
    GroupFires,

    /// Reclassify annual land-cover rasters
    ReclassLandcover,

    /// Convert TRMM precipitation rates into monthly accumulations
    ExtractPrecipitation,

    /// Resample land cover and precipitation onto the fire grid
    Resample,

    /// Mask every product to the area of interest
    Mask,

    /// Distance to the nearest forest pixel, one raster per year
    Proximity,

    /// Build one dataset, or every dataset with `all`
    Dataset {
        /// groupby_area, landcover_per_fire_pixel, landcover_normalized_area,
        /// fire_pixels_proportion_per_landcover, landcover_and_forest_proximity_per_pixel or all
        name: String,
    },

    /// Describe a single raster file
    Describe { file: PathBuf },

    /// Run every stage in order, then build all datasets
    RunAll,
}
