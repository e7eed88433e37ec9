//! Raster inspection: grid, georeferencing, NoData and value summary of one file

use crate::errors::Result;
use crate::raster_io::{read_raster, PixelType, Raster};
use netcdf::AttributeValue;
use std::fmt;
use std::path::Path;

/// Quick statistics over the valid cells of a raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueSummary {
    pub valid_cells: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Everything `describe` reports about a raster file
#[derive(Debug, Clone)]
pub struct RasterDescription {
    pub rows: usize,
    pub cols: usize,
    pub geotransform: [f64; 6],
    pub crs_wkt: String,
    pub nodata: Option<f64>,
    pub pixel_type: PixelType,
    pub history: Option<String>,
    /// `None` when every cell is NoData
    pub summary: Option<ValueSummary>,
}

/// Min/max/mean/std of the cells that are not NoData
pub fn summarize_values(raster: &Raster) -> Option<ValueSummary> {
    let valid: Vec<f64> = raster
        .data
        .iter()
        .filter(|&&v| !raster.is_nodata(v))
        .map(|&v| f64::from(v))
        .collect();
    if valid.is_empty() {
        return None;
    }

    let n = valid.len() as f64;
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = valid.iter().sum::<f64>() / n;
    let std_dev = (valid.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

    Some(ValueSummary {
        valid_cells: valid.len(),
        min,
        max,
        mean,
        std_dev,
    })
}

/// Inspect a raster file
pub fn describe_raster(path: &Path) -> Result<RasterDescription> {
    let raster = read_raster(path)?;
    let history = match netcdf::open(path)?.attribute("history").map(|a| a.value()) {
        Some(Ok(AttributeValue::Str(text))) => Some(text),
        _ => None,
    };
    let (rows, cols) = raster.data.dim();

    Ok(RasterDescription {
        rows,
        cols,
        geotransform: raster.georef.geotransform,
        crs_wkt: raster.georef.crs_wkt.clone(),
        nodata: raster.nodata,
        pixel_type: raster.pixel_type,
        history,
        summary: summarize_values(&raster),
    })
}

impl fmt::Display for RasterDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n Raster Description")?;
        writeln!(f, "====================")?;
        writeln!(f, " Shape: ({} × {})", self.rows, self.cols)?;
        writeln!(f, " Pixel type: {}", self.pixel_type)?;
        match self.nodata {
            Some(nd) => writeln!(f, " NoData: {}", nd)?,
            None => writeln!(f, " NoData: (none)")?,
        }
        writeln!(f, " GeoTransform: {:?}", self.geotransform)?;
        if self.crs_wkt.is_empty() {
            writeln!(f, " CRS: (undefined)")?;
        } else {
            writeln!(f, " CRS: {}", self.crs_wkt)?;
        }
        if let Some(history) = &self.history {
            writeln!(f, " History: {}", history)?;
        }

        match &self.summary {
            Some(s) => {
                writeln!(f, "\n Summary of {} valid cells", s.valid_cells)?;
                writeln!(f, "   Min: {}", s.min)?;
                writeln!(f, "   Max: {}", s.max)?;
                writeln!(f, "   Mean: {:.2}", s.mean)?;
                write!(f, "   Std Dev: {:.2}", s.std_dev)
            }
            None => write!(f, "\n No valid cells"),
        }
    }
}
