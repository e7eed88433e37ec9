//! Directory-level pipeline stages
//!
//! Each stage reads one product directory, applies a component and writes one raster
//! per period into the next directory. Outputs are written atomically, so when
//! `skip_existing` is set an output already on disk is complete and is left alone.

use crate::alignment::{mask_to_aoi, orient_swath, ReferenceGrid, ResampleMethod};
use crate::classify::classify_landcover_array;
use crate::config::PipelineConfig;
use crate::datasets::DatasetKind;
use crate::errors::{PipelineError, Result};
use crate::period::{parse_year, parse_year_month};
use crate::proximity::{distance_to_nearest_with, ProximityOptions};
use crate::raster_io::{
    is_nodata, list_raster_files, read_raster, write, write_raster, GeoReference, PixelType, Raster,
    RASTER_EXTENSION, WGS84_WKT,
};
use crate::temporal::{
    display_name, group_by_month, monthly_fire_name, monthly_fire_sum, precipitation_accumulation,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// NoData written into precipitation accumulations
pub const PRECIPITATION_NODATA: f64 = -9999.0;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GroupFires,
    ReclassLandcover,
    ExtractPrecipitation,
    Resample,
    Mask,
    ForestProximity,
    Datasets,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::GroupFires,
        Stage::ReclassLandcover,
        Stage::ExtractPrecipitation,
        Stage::Resample,
        Stage::Mask,
        Stage::ForestProximity,
        Stage::Datasets,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GroupFires => "group-fires",
            Self::ReclassLandcover => "reclass-landcover",
            Self::ExtractPrecipitation => "extract-precipitation",
            Self::Resample => "resample",
            Self::Mask => "mask",
            Self::ForestProximity => "forest-proximity",
            Self::Datasets => "datasets",
        }
    }

    /// Run this stage; returns the number of outputs written
    pub fn run(self, config: &PipelineConfig) -> Result<usize> {
        log::info!("🚀 Stage {}", self.as_str());
        match self {
            Self::GroupFires => group_fires(config),
            Self::ReclassLandcover => reclass_landcover(config),
            Self::ExtractPrecipitation => extract_precipitation(config),
            Self::Resample => resample_products(config),
            Self::Mask => mask_products(config),
            Self::ForestProximity => forest_proximity(config),
            Self::Datasets => build_datasets(config, &DatasetKind::ALL),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Run every stage in order
pub fn run_all(config: &PipelineConfig) -> Result<usize> {
    let mut written = 0;
    for stage in Stage::ALL {
        written += stage.run(config)?;
    }
    Ok(written)
}

fn should_skip(path: &Path, config: &PipelineConfig) -> bool {
    let skip = config.skip_existing && path.exists();
    if skip {
        log::debug!("Skipping existing {}", path.display());
    }
    skip
}

fn inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let files = list_raster_files(dir)?;
    if files.is_empty() {
        return Err(PipelineError::EmptyDirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reduce 8-day fire composites to monthly fire counts
pub fn group_fires(config: &PipelineConfig) -> Result<usize> {
    let src = config.resolve(&config.paths.fire_original);
    let dst = config.resolve(&config.paths.fire_preprocessed);
    let groups = group_by_month(&inputs(&src)?)?;

    let mut written = 0;
    for ((year, month), files) in &groups {
        let out = dst.join(monthly_fire_name(*year, *month));
        if should_skip(&out, config) {
            continue;
        }
        log::debug!("{}-{:02}: {} composites", year, month, files.len());
        let (summed, georef) = monthly_fire_sum(files, config.uncertain_sentinel)?;
        write_raster(
            &summed.mapv(f32::from),
            &out,
            &georef,
            PixelType::UInt16,
            Some(f64::from(config.uncertain_sentinel)),
        )?;
        written += 1;
    }
    log::info!("✅ {} monthly fire rasters written to {}", written, dst.display());
    Ok(written)
}

/// Reclassify annual land-cover rasters; no temporal reduction takes place
pub fn reclass_landcover(config: &PipelineConfig) -> Result<usize> {
    let src = config.resolve(&config.paths.landcover_original);
    let dst = config.resolve(&config.paths.landcover_preprocessed);

    let mut written = 0;
    for path in inputs(&src)? {
        let year = parse_year(&file_name(&path))?;
        let out = dst.join(format!("MCD12Q1_{year}.{RASTER_EXTENSION}"));
        if should_skip(&out, config) {
            continue;
        }
        let raster = read_raster(&path)?;
        let classes = classify_landcover_array(&raster.data);
        write_raster(&classes, &out, &raster.georef, PixelType::UInt16, raster.nodata)?;
        written += 1;
    }
    log::info!("✅ {} land-cover rasters written to {}", written, dst.display());
    Ok(written)
}

/// Turn TRMM monthly rates into georeferenced monthly accumulations
pub fn extract_precipitation(config: &PipelineConfig) -> Result<usize> {
    let src = config.resolve(&config.paths.ppt_original);
    let dst = config.resolve(&config.paths.ppt_preprocessed);
    let georef = GeoReference::new(
        [
            config.bbox.min_x,
            config.ppt_cell_size,
            0.0,
            config.bbox.max_y,
            0.0,
            -config.ppt_cell_size,
        ],
        WGS84_WKT,
    );

    let mut written = 0;
    for path in inputs(&src)? {
        let (year, month) = parse_year_month(&file_name(&path))?;
        let out = dst.join(format!("3B43_{year}{month:02}.{RASTER_EXTENSION}"));
        if should_skip(&out, config) {
            continue;
        }
        let swath = read_raster(&path)?;
        let rate = orient_swath(&swath.data);
        let accumulation = precipitation_accumulation(&rate, swath.nodata, year, month)?
            .mapv(|v| if is_nodata(v, swath.nodata) { PRECIPITATION_NODATA as f32 } else { v });
        write_raster(
            &accumulation,
            &out,
            &georef,
            PixelType::Float32,
            Some(PRECIPITATION_NODATA),
        )?;
        written += 1;
    }
    log::info!("✅ {} precipitation rasters written to {}", written, dst.display());
    Ok(written)
}

/// The first original fire composite defines the grid every product is aligned to
pub fn reference_grid(config: &PipelineConfig) -> Result<ReferenceGrid> {
    let reference = inputs(&config.resolve(&config.paths.fire_original))?;
    let grid = ReferenceGrid::of(&read_raster(&reference[0])?);
    log::info!(
        "Reference grid {} x {} from {}",
        grid.shape.0,
        grid.shape.1,
        file_name(&reference[0])
    );
    Ok(grid)
}

/// Resample land cover and precipitation onto the fire product's grid
pub fn resample_products(config: &PipelineConfig) -> Result<usize> {
    let grid = reference_grid(config)?;
    let products = [
        (&config.paths.landcover_preprocessed, &config.paths.landcover_resampled, config.landcover_resampling),
        (&config.paths.ppt_preprocessed, &config.paths.ppt_resampled, config.ppt_resampling),
    ];

    let mut written = 0;
    for (src, dst, method) in products {
        let dst = config.resolve(dst);
        for path in inputs(&config.resolve(src))? {
            let out = dst.join(file_name(&path));
            if should_skip(&out, config) {
                continue;
            }
            let raster = read_raster(&path)?;
            write(&grid.align(&raster, method), &out)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Mask every product to the area of interest and crop it to the AOI's extent
///
/// Products and the AOI are first put on the reference grid, so every prepared
/// raster ends up with the same geotransform and shape.
pub fn mask_products(config: &PipelineConfig) -> Result<usize> {
    let grid = reference_grid(config)?;
    let aoi = grid.align(
        &read_raster(&config.resolve(&config.paths.aoi_mask))?,
        ResampleMethod::Nearest,
    );
    let products = [
        (&config.paths.landcover_resampled, &config.paths.landcover_prepared, config.landcover_resampling),
        (&config.paths.evi_original, &config.paths.evi_prepared, ResampleMethod::Bilinear),
        (&config.paths.fire_preprocessed, &config.paths.fire_prepared, ResampleMethod::Nearest),
        (&config.paths.ppt_resampled, &config.paths.ppt_prepared, config.ppt_resampling),
    ];

    let mut written = 0;
    for (src, dst, method) in products {
        let dst = config.resolve(dst);
        for path in inputs(&config.resolve(src))? {
            let out = dst.join(file_name(&path));
            if should_skip(&out, config) {
                continue;
            }
            let raster = read_raster(&path)?;
            if !grid.contains(&raster) {
                log::warn!("{} is off the reference grid, resampling", file_name(&path));
            }
            let raster = grid.align(&raster, method);
            let fallback = match raster.pixel_type {
                PixelType::Float32 => PRECIPITATION_NODATA,
                _ => f64::from(config.uncertain_sentinel),
            };
            write(&mask_to_aoi(&raster, &aoi, fallback, true)?, &out)?;
            written += 1;
        }
        log::info!("✅ Masked {}", display_name(&dst));
    }
    Ok(written)
}

/// Distance to the nearest forest pixel for every prepared land-cover year
pub fn forest_proximity(config: &PipelineConfig) -> Result<usize> {
    let src = config.resolve(&config.paths.landcover_prepared);
    let dst = config.resolve(&config.paths.forest_distance);
    let options = ProximityOptions {
        metric: config.distance_metric,
        max_distance: None,
        nodata: config.forest_distance_nodata,
    };

    let mut written = 0;
    for path in inputs(&src)? {
        let year = parse_year(&file_name(&path))?;
        let out = dst.join(format!("DTNF_{year}.{RASTER_EXTENSION}"));
        if should_skip(&out, config) {
            continue;
        }
        let landcover: Raster = read_raster(&path)?;
        let distance = distance_to_nearest_with(&landcover, &[config.forest_code], &options);
        write(&distance, &out)?;
        written += 1;
    }
    log::info!("✅ {} forest proximity rasters written to {}", written, dst.display());
    Ok(written)
}

/// Build the requested datasets
pub fn build_datasets(config: &PipelineConfig, kinds: &[DatasetKind]) -> Result<usize> {
    for kind in kinds {
        kind.build(config)?;
    }
    Ok(kinds.len())
}
