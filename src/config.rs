//! Immutable pipeline configuration
//!
//! All constants the research workflow relies on (directory layout, date ranges,
//! category names, bounding box, sampling parameters) live in [`PipelineConfig`].
//! A single instance is built at start-up and passed by reference into every stage.

use crate::alignment::ResampleMethod;
use crate::errors::Result;
use crate::proximity::DistanceMetric;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Geographic bounding box in degrees (WGS 84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Layout of the data tree, relative to `data_root`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPaths {
    pub fire_original: PathBuf,
    pub fire_preprocessed: PathBuf,
    pub fire_prepared: PathBuf,
    pub landcover_original: PathBuf,
    pub landcover_preprocessed: PathBuf,
    pub landcover_resampled: PathBuf,
    pub landcover_prepared: PathBuf,
    pub evi_original: PathBuf,
    pub evi_prepared: PathBuf,
    pub ppt_original: PathBuf,
    pub ppt_preprocessed: PathBuf,
    pub ppt_resampled: PathBuf,
    pub ppt_prepared: PathBuf,
    pub forest_distance: PathBuf,
    pub aoi_mask: PathBuf,
    pub csv: PathBuf,
}

impl Default for ProductPaths {
    fn default() -> Self {
        Self {
            fire_original: "tif/MODIS/MOD14A2/original".into(),
            fire_preprocessed: "tif/MODIS/MOD14A2/preprocessed".into(),
            fire_prepared: "tif/MODIS/MOD14A2/prepared".into(),
            landcover_original: "tif/MODIS/MCD12Q1/original".into(),
            landcover_preprocessed: "tif/MODIS/MCD12Q1/preprocessed".into(),
            landcover_resampled: "tif/MODIS/MCD12Q1/resampled".into(),
            landcover_prepared: "tif/MODIS/MCD12Q1/prepared".into(),
            evi_original: "tif/MODIS/MOD13A3/original".into(),
            evi_prepared: "tif/MODIS/MOD13A3/prepared".into(),
            ppt_original: "tif/TRMM/3B43/original".into(),
            ppt_preprocessed: "tif/TRMM/3B43/preprocessed".into(),
            ppt_resampled: "tif/TRMM/3B43/resampled".into(),
            ppt_prepared: "tif/TRMM/3B43/prepared".into(),
            forest_distance: "tif/MODIS/derived/DTNF".into(),
            aoi_mask: "aoi/TDF_biome_COL_4326.nc".into(),
            csv: "csv".into(),
        }
    }
}

/// Configuration shared by every pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the data tree; every entry of `paths` is relative to it
    pub data_root: PathBuf,
    pub paths: ProductPaths,

    /// First month of the fire record
    pub first_month: NaiveDate,
    /// Last month of the fire record (inclusive)
    pub last_month: NaiveDate,
    /// First and last year of the land-cover record (inclusive)
    pub first_year: i32,
    pub last_year: i32,

    pub bbox: BoundingBox,
    /// Cell size of the TRMM 3B43 grid in degrees
    pub ppt_cell_size: f64,
    /// Kernels used to bring land cover and precipitation onto the fire grid
    pub landcover_resampling: ResampleMethod,
    pub ppt_resampling: ResampleMethod,

    /// Names of the reclassified land covers, keyed by code. Code 0 (non-flammable)
    /// is deliberately absent.
    pub landcovers: BTreeMap<u16, String>,
    pub forest_code: u16,

    pub evi_scaling_factor: f64,
    pub uncertain_sentinel: u16,

    pub forest_distance_nodata: f64,
    pub distance_metric: DistanceMetric,

    /// Number of preceding periods averaged into the `_prev` columns
    pub rolling_window: usize,
    pub sample_size: usize,
    pub seed: u64,

    /// Leave existing outputs in place instead of recomputing them
    pub skip_existing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let landcovers = [(1, "Forest"), (2, "Savanna"), (3, "Grassland"), (4, "Cropland")]
            .into_iter()
            .map(|(code, name)| (code, name.to_string()))
            .collect();

        Self {
            data_root: PathBuf::from("data"),
            paths: ProductPaths::default(),
            first_month: NaiveDate::from_ymd_opt(2002, 1, 1).unwrap_or_default(),
            last_month: NaiveDate::from_ymd_opt(2016, 12, 1).unwrap_or_default(),
            first_year: 2002,
            last_year: 2016,
            bbox: BoundingBox {
                min_x: -78.9909352282,
                min_y: -4.29818694419,
                max_x: -66.8763258531,
                max_y: 12.4373031682,
            },
            ppt_cell_size: 0.25,
            landcover_resampling: ResampleMethod::Mode,
            ppt_resampling: ResampleMethod::Bilinear,
            landcovers,
            forest_code: 1,
            evi_scaling_factor: 0.0001,
            uncertain_sentinel: 255,
            forest_distance_nodata: 32767.0,
            distance_metric: DistanceMetric::Euclidean,
            rolling_window: 3,
            sample_size: 25_000,
            seed: 42,
            skip_existing: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Resolve a product directory against the data root
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.data_root.join(relative)
    }
}
