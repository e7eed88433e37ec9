//! Temporal aggregation of per-period rasters
//!
//! The fire product is delivered as 8-day composites which are grouped into calendar
//! months and reduced with [`sum_periods`]. Land cover is annual already and is only
//! reclassified, never reduced. TRMM precipitation arrives as a monthly mean rate and
//! is turned into a monthly accumulation.

use crate::classify::{classify_fire_array, FireClass};
use crate::errors::{PipelineError, Result};
use crate::period::{days_in_month, doy_to_month, parse_year_doy};
use crate::raster_io::{is_nodata, read_raster, GeoReference};
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Ix1, Zip};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output value for pixels never observed with confidence
pub const UNCERTAIN_SENTINEL: u16 = 255;

fn reduce_lane<S>(lane: ArrayBase<S, Ix1>, sentinel: u16) -> u16
where
    S: Data<Elem = FireClass>,
{
    let mut any_fire = false;
    let mut any_certain = false;
    let mut total: u32 = 0;
    for class in lane.iter() {
        if let Some(value) = class.value() {
            any_certain = true;
            any_fire |= *class == FireClass::Fire;
            total += u32::from(value);
        }
    }
    if any_fire {
        u16::try_from(total).unwrap_or(u16::MAX)
    } else if any_certain {
        0
    } else {
        sentinel
    }
}

/// Collapse a (period, y, x) stack of fire classes into one raster
///
/// Per pixel: when any period is fire, the sum of the non-uncertain periods; otherwise
/// 0 when at least one period is a confident non-fire; otherwise `sentinel`.
pub fn sum_periods_with_sentinel(classes: &Array3<FireClass>, sentinel: u16) -> Array2<u16> {
    Zip::from(classes.lanes(Axis(0))).par_map_collect(|lane| reduce_lane(lane, sentinel))
}

/// [`sum_periods_with_sentinel`] with the standard 255 sentinel
pub fn sum_periods(classes: &Array3<FireClass>) -> Array2<u16> {
    sum_periods_with_sentinel(classes, UNCERTAIN_SENTINEL)
}

/// Group 8-day product files by (year, month) of their `YYYYDDD` stamp
pub fn group_by_month(files: &[PathBuf]) -> Result<BTreeMap<(i32, u32), Vec<PathBuf>>> {
    let mut groups: BTreeMap<(i32, u32), Vec<PathBuf>> = BTreeMap::new();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (year, doy) = parse_year_doy(&name)?;
        let month = doy_to_month(year, doy)?;
        groups.entry((year, month)).or_default().push(path.clone());
    }
    Ok(groups)
}

/// Read a month of raw fire-mask composites and reduce them to a monthly fire count
///
/// Returns the monthly raster and the georeference of the first composite.
pub fn monthly_fire_sum(files: &[PathBuf], sentinel: u16) -> Result<(Array2<u16>, GeoReference)> {
    let first = files.first().ok_or_else(|| {
        PipelineError::shape("a month needs at least one fire composite")
    })?;
    let first = read_raster(first)?;
    let (rows, cols) = first.data.dim();

    let mut raw = Array3::<f32>::zeros((files.len(), rows, cols));
    raw.index_axis_mut(Axis(0), 0).assign(&first.data);
    for (i, path) in files.iter().enumerate().skip(1) {
        let raster = read_raster(path)?;
        if raster.data.dim() != (rows, cols) {
            return Err(PipelineError::shape(format!(
                "'{}' is {:?}, expected {:?}",
                path.display(),
                raster.data.dim(),
                (rows, cols)
            )));
        }
        raw.index_axis_mut(Axis(0), i).assign(&raster.data);
    }

    let classes = classify_fire_array(&raw);
    Ok((sum_periods_with_sentinel(&classes, sentinel), first.georef))
}

/// Convert a mean precipitation rate (mm/h) into the month's accumulation (mm)
pub fn precipitation_accumulation(
    rate: &Array2<f32>,
    nodata: Option<f64>,
    year: i32,
    month: u32,
) -> Result<Array2<f32>> {
    let hours = 24.0 * days_in_month(year, month)? as f32;
    Ok(rate.mapv(|v| if is_nodata(v, nodata) { v } else { v * hours }))
}

/// Output file name for a monthly fire raster
pub fn monthly_fire_name(year: i32, month: u32) -> String {
    format!("MOD14A2_{year}{month:02}.{}", crate::raster_io::RASTER_EXTENSION)
}

/// File name component of a path, for log messages
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
