//! tdf_fire: wildfire raster pipeline for the Colombian tropical dry forest
//!
//! Turns MODIS fire, land-cover and vegetation rasters plus TRMM precipitation into
//! aligned monthly/yearly raster stacks, then into tabular datasets for analysing
//! the environmental drivers of fire.
//!
//! ## Module Organization
//!
//! - [`raster_io`]: georeferenced raster files and period-indexed stacks
//! - [`classify`]: fire-mask and land-cover reclassification
//! - [`temporal`]: three-way fire sums and monthly grouping of 8-day composites
//! - [`proximity`]: distance to the nearest target pixel
//! - [`alignment`]: resampling, AOI masking and swath orientation
//! - [`statistics`]: masked area-wide statistics and trailing windows
//! - [`datasets`]: the five output tables
//! - [`sampling`]: seeded undersampling and subsampling
//! - [`pipeline`]: directory-level stages with skip-if-complete
//! - [`metadata`]: raster inspection
//! - [`config`], [`period`], [`table`], [`parallel`], [`errors`]
//!
//! ## Usage
//! ```rust,no_run
//! use tdf_fire::prelude::*;
//!
//! let config = PipelineConfig::default();
//! tdf_fire::pipeline::group_fires(&config).unwrap();
//! DatasetKind::GroupbyArea.build(&config).unwrap();
//! ```

pub mod alignment;
pub mod classify;
pub mod config;
pub mod datasets;
pub mod errors;
pub mod metadata;
pub mod parallel;
pub mod period;
pub mod pipeline;
pub mod proximity;
pub mod raster_io;
pub mod sampling;
pub mod statistics;
pub mod table;
pub mod temporal;

pub use config::PipelineConfig;
pub use errors::{PipelineError, Result};
pub use raster_io::{GeoReference, PixelType, Raster, RasterStack};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::classify::{classify_fire, classify_landcover, FireClass};
    pub use crate::config::PipelineConfig;
    pub use crate::datasets::DatasetKind;
    pub use crate::errors::{PipelineError, Result};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::Stage;
    pub use crate::proximity::{distance_to_nearest, DistanceMetric};
    pub use crate::raster_io::{read_raster, read_stack, write_raster, GeoReference, PixelType, Raster, RasterStack};
    pub use crate::statistics::StatOperation;
    pub use crate::temporal::sum_periods;
}
