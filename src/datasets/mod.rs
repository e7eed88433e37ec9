//! Tabular datasets built from the prepared raster stacks
//!
//! - [`area`]: monthly area-wide fire, vegetation and precipitation summaries
//! - [`landcover`]: land cover of burned pixels, cover areas, fire incidence per cover
//! - [`forest`]: balanced pixel-level sample with distance to the nearest forest
//!
//! The `build_*` functions load the stacks named in a [`PipelineConfig`], compute the
//! table and write it to the configured CSV directory.

pub mod area;
pub mod forest;
pub mod landcover;

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::period::{monthly_range, shift_months, yearly_range};
use crate::raster_io::{read_stack, RasterStack};
use crate::table::{field, write_records, write_rows};
use area::{summarize_area, AreaColumn};
use chrono::{Datelike, NaiveDate};
use forest::{balanced_sample, pixel_observations, SampleOptions};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The datasets this crate can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    GroupbyArea,
    LandcoverPerFirePixel,
    LandcoverNormalizedArea,
    FireProportionPerLandcover,
    ForestProximityPerPixel,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::GroupbyArea,
        DatasetKind::LandcoverPerFirePixel,
        DatasetKind::LandcoverNormalizedArea,
        DatasetKind::FireProportionPerLandcover,
        DatasetKind::ForestProximityPerPixel,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GroupbyArea => "groupby_area",
            Self::LandcoverPerFirePixel => "landcover_per_fire_pixel",
            Self::LandcoverNormalizedArea => "landcover_normalized_area",
            Self::FireProportionPerLandcover => "fire_pixels_proportion_per_landcover",
            Self::ForestProximityPerPixel => "landcover_and_forest_proximity_per_pixel",
        }
    }

    /// CSV file the dataset is written to
    pub fn output_path(self, config: &PipelineConfig) -> PathBuf {
        config
            .resolve(&config.paths.csv)
            .join(format!("{}.csv", self.as_str()))
    }

    /// Build the dataset and write it, returning the CSV path
    pub fn build(self, config: &PipelineConfig) -> Result<PathBuf> {
        let path = self.output_path(config);
        log::info!("📊 Building {}", self.as_str());
        match self {
            Self::GroupbyArea => build_groupby_area(config, &path)?,
            Self::LandcoverPerFirePixel => build_landcover_per_fire_pixel(config, &path)?,
            Self::LandcoverNormalizedArea => build_landcover_normalized_area(config, &path)?,
            Self::FireProportionPerLandcover => build_fire_proportion(config, &path)?,
            Self::ForestProximityPerPixel => build_forest_proximity(config, &path)?,
        }
        Ok(path)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown dataset '{s}', expected one of: {}", known.join(", "))
            })
    }
}

fn fire_months(config: &PipelineConfig) -> Vec<NaiveDate> {
    monthly_range(config.first_month, config.last_month)
}

/// Monthly index extended backwards by the rolling window
fn offset_months(config: &PipelineConfig) -> Result<Vec<NaiveDate>> {
    let back = i32::try_from(config.rolling_window).map_err(|_| PipelineError::InvalidPeriod {
        message: format!("rolling window {} is too large", config.rolling_window),
    })?;
    let start = shift_months(config.first_month, -back).ok_or_else(|| {
        PipelineError::InvalidPeriod {
            message: format!("cannot go {back} months before {}", config.first_month),
        }
    })?;
    Ok(monthly_range(start, config.last_month))
}

fn years(config: &PipelineConfig) -> Vec<i32> {
    (config.first_year..=config.last_year).collect()
}

fn load(config: &PipelineConfig, dir: &Path, periods: &[NaiveDate]) -> Result<RasterStack> {
    read_stack(&config.resolve(dir), periods)
}

fn load_fire(config: &PipelineConfig) -> Result<RasterStack> {
    load(config, &config.paths.fire_prepared, &fire_months(config))
}

fn load_landcover(config: &PipelineConfig) -> Result<RasterStack> {
    load(
        config,
        &config.paths.landcover_prepared,
        &yearly_range(config.first_year, config.last_year),
    )
}

fn build_groupby_area(config: &PipelineConfig, path: &Path) -> Result<()> {
    let months = fire_months(config);
    let offset = offset_months(config)?;
    let fire = load_fire(config)?;
    let evi = load(config, &config.paths.evi_prepared, &offset)?;
    let ppt = load(config, &config.paths.ppt_prepared, &offset)?;

    let columns = vec![
        AreaColumn::new("fire_pixels", &fire, "sum", false)?,
        AreaColumn::new("evi", &evi, "mean", true)?.scaled(config.evi_scaling_factor),
        AreaColumn::new("ppt", &ppt, "mean", true)?,
    ];
    let table = summarize_area(&months, &columns, config.rolling_window)?;
    let (header, records) = table.to_records();
    write_records(path, &header, &records)
}

fn build_landcover_per_fire_pixel(config: &PipelineConfig, path: &Path) -> Result<()> {
    let fire = load_fire(config)?;
    let landcover = load_landcover(config)?;
    let rows =
        landcover::landcover_per_fire_pixel(&fire, &landcover, &years(config), &config.landcovers)?;
    write_rows(path, &["year", "code", "name"], &rows)
}

fn build_landcover_normalized_area(config: &PipelineConfig, path: &Path) -> Result<()> {
    let landcover = load_landcover(config)?;
    let rows = landcover::landcover_normalized_area(&landcover, &years(config), &config.landcovers)?;
    write_rows(path, &["year", "code", "pixels", "proportion", "name"], &rows)
}

fn build_fire_proportion(config: &PipelineConfig, path: &Path) -> Result<()> {
    let fire = load_fire(config)?;
    let landcover = load_landcover(config)?;
    let months: Vec<NaiveDate> = fire_months(config)
        .into_iter()
        .filter(|m| (config.first_year..=config.last_year).contains(&m.year()))
        .collect();
    let rows =
        landcover::fire_proportion_per_landcover(&fire, &landcover, &months, &config.landcovers)?;

    let mut header = vec!["date".to_string()];
    header.extend(config.landcovers.values().cloned());
    let records: Vec<Vec<String>> = rows
        .into_iter()
        .map(|(month, proportions)| {
            let mut record = vec![month.format("%Y-%m-%d").to_string()];
            record.extend(proportions.into_iter().map(field));
            record
        })
        .collect();
    write_records(path, &header, &records)
}

fn build_forest_proximity(config: &PipelineConfig, path: &Path) -> Result<()> {
    let fire = load_fire(config)?;
    let landcover = load_landcover(config)?;
    let mut distance = load(
        config,
        &config.paths.forest_distance,
        &yearly_range(config.first_year, config.last_year),
    )?;
    if distance.nodata.is_none() {
        distance.nodata = Some(config.forest_distance_nodata);
    }

    let rows = pixel_observations(&fire, &landcover, &distance, &years(config))?;
    let sample = balanced_sample(
        &rows,
        SampleOptions {
            sample_size: config.sample_size,
            seed: config.seed,
        },
        &config.landcovers,
    );
    write_rows(
        path,
        &["is_fire_pixel", "year", "lc_code", "forest_distance", "lc_name"],
        &sample,
    )
}
