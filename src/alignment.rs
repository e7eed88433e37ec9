//! Grid alignment: resampling onto a reference grid and masking to the study area
//!
//! Every product is brought onto the fire product's grid (origin, cell size and
//! shape) before masking, so cropped outputs share one geotransform and can be
//! combined cell by cell.

use crate::errors::{PipelineError, Result};
use crate::raster_io::{ensure_aligned, GeoReference, Raster};
use ndarray::{s, Array2, Zip};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ResampleMethod {
    /// Value of the source cell containing the target cell centre
    Nearest,
    /// Most frequent source value inside the target cell (categorical data)
    Mode,
    /// Distance-weighted mean of the four surrounding source cell centres
    Bilinear,
}

impl FromStr for ResampleMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "near" | "nearest" => Ok(Self::Nearest),
            "mode" => Ok(Self::Mode),
            "bilinear" => Ok(Self::Bilinear),
            other => Err(PipelineError::alignment(format!(
                "unknown resampling method '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for ResampleMethod {
    type Error = PipelineError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Grid every product is aligned to before masking
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGrid {
    pub georef: GeoReference,
    pub shape: (usize, usize),
}

impl ReferenceGrid {
    /// The grid a raster lies on
    pub fn of(raster: &Raster) -> Self {
        Self {
            georef: raster.georef.clone(),
            shape: raster.data.dim(),
        }
    }

    pub fn contains(&self, raster: &Raster) -> bool {
        raster.georef == self.georef && raster.data.dim() == self.shape
    }

    /// Bring a raster onto this grid; rasters already on it are returned as they are
    pub fn align(&self, src: &Raster, method: ResampleMethod) -> Raster {
        if self.contains(src) {
            return src.clone();
        }
        resample(src, &self.georef, self.shape, method)
    }
}

/// Source pixel coordinates (fractional column, row) of a geographic point.
/// Rotated geotransforms are not supported.
fn to_pixel(georef: &GeoReference, x: f64, y: f64) -> (f64, f64) {
    let gt = &georef.geotransform;
    ((x - gt[0]) / gt[1], (y - gt[3]) / gt[5])
}

fn sample_nearest(src: &Raster, col: f64, row: f64) -> Option<f32> {
    let (rows, cols) = src.data.dim();
    if col < 0.0 || row < 0.0 {
        return None;
    }
    let (c, r) = (col.floor() as usize, row.floor() as usize);
    if r >= rows || c >= cols {
        return None;
    }
    let v = src.data[[r, c]];
    (!src.is_nodata(v)).then_some(v)
}

fn sample_bilinear(src: &Raster, col: f64, row: f64) -> Option<f32> {
    let (rows, cols) = src.data.dim();
    let (fx, fy) = (col - 0.5, row - 0.5);
    let (x0, y0) = (fx.floor(), fy.floor());
    let (tx, ty) = (fx - x0, fy - y0);

    let mut total = 0.0f64;
    let mut weight = 0.0f64;
    for (dy, wy) in [(0.0, 1.0 - ty), (1.0, ty)] {
        for (dx, wx) in [(0.0, 1.0 - tx), (1.0, tx)] {
            let (r, c) = (y0 + dy, x0 + dx);
            if r < 0.0 || c < 0.0 || r >= rows as f64 || c >= cols as f64 {
                continue;
            }
            let v = src.data[[r as usize, c as usize]];
            let w = wx * wy;
            if w > 0.0 && !src.is_nodata(v) {
                total += f64::from(v) * w;
                weight += w;
            }
        }
    }
    (weight > 0.0).then(|| (total / weight) as f32)
}

fn sample_mode(src: &Raster, col0: f64, row0: f64, col1: f64, row1: f64) -> Option<f32> {
    let (rows, cols) = src.data.dim();
    let (c_lo, c_hi) = (col0.min(col1), col0.max(col1));
    let (r_lo, r_hi) = (row0.min(row1), row0.max(row1));

    // source cells whose centres fall inside the target footprint
    let first_col = (c_lo - 0.5).ceil().max(0.0) as usize;
    let first_row = (r_lo - 0.5).ceil().max(0.0) as usize;
    let last_col = ((c_hi - 0.5).ceil().max(0.0) as usize).min(cols);
    let last_row = ((r_hi - 0.5).ceil().max(0.0) as usize).min(rows);

    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut seen = false;
    for r in first_row..last_row {
        for c in first_col..last_col {
            seen = true;
            let v = src.data[[r, c]];
            if !src.is_nodata(v) {
                *counts.entry(v.to_bits()).or_default() += 1;
            }
        }
    }
    if !seen {
        return sample_nearest(src, (c_lo + c_hi) / 2.0, (r_lo + r_hi) / 2.0);
    }
    counts
        .into_iter()
        .map(|(bits, n)| (f32::from_bits(bits), n))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.total_cmp(&a.0)))
        .map(|(v, _)| v)
}

/// Resample a raster onto an explicit target grid; the result carries the target's
/// geotransform and CRS
pub fn resample(
    src: &Raster,
    target: &GeoReference,
    shape: (usize, usize),
    method: ResampleMethod,
) -> Raster {
    let fill = src.nodata.map_or(f32::NAN, |nd| nd as f32);
    let tgt = &target.geotransform;

    let mut data = Array2::<f32>::from_elem(shape, fill);
    Zip::indexed(&mut data).par_for_each(|(r, c), out| {
        let value = match method {
            ResampleMethod::Nearest | ResampleMethod::Bilinear => {
                let (x, y) = target.cell_center(r, c);
                let (col, row) = to_pixel(&src.georef, x, y);
                if method == ResampleMethod::Nearest {
                    sample_nearest(src, col, row)
                } else {
                    sample_bilinear(src, col, row)
                }
            }
            ResampleMethod::Mode => {
                let x0 = tgt[0] + c as f64 * tgt[1];
                let y0 = tgt[3] + r as f64 * tgt[5];
                let (col0, row0) = to_pixel(&src.georef, x0, y0);
                let (col1, row1) = to_pixel(&src.georef, x0 + tgt[1], y0 + tgt[5]);
                sample_mode(src, col0, row0, col1, row1)
            }
        };
        if let Some(v) = value {
            *out = v;
        }
    });

    Raster {
        data,
        georef: target.clone(),
        nodata: src.nodata,
        pixel_type: src.pixel_type,
    }
}

/// Mask a raster to an area-of-interest raster on the same grid
///
/// Cells where the AOI is NoData or zero become NoData (`fallback_nodata` when the
/// raster declares none). With `crop`, the result is cut to the bounding box of the
/// AOI's valid cells.
pub fn mask_to_aoi(src: &Raster, aoi: &Raster, fallback_nodata: f64, crop: bool) -> Result<Raster> {
    ensure_aligned(
        (&src.georef, src.data.dim()),
        (&aoi.georef, aoi.data.dim()),
    )?;
    let nodata = src.nodata.unwrap_or(fallback_nodata);
    let inside = aoi.data.mapv(|v| !aoi.is_nodata(v) && v != 0.0);

    let mut data = src.data.clone();
    Zip::from(&mut data).and(&inside).for_each(|v, &keep| {
        if !keep {
            *v = nodata as f32;
        }
    });

    let mut georef = src.georef.clone();
    if crop {
        let rows: Vec<usize> = inside
            .outer_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&k| k))
            .map(|(i, _)| i)
            .collect();
        let cols: Vec<usize> = inside
            .columns()
            .into_iter()
            .enumerate()
            .filter(|(_, col)| col.iter().any(|&k| k))
            .map(|(i, _)| i)
            .collect();
        match (rows.first(), rows.last(), cols.first(), cols.last()) {
            (Some(&r0), Some(&r1), Some(&c0), Some(&c1)) => {
                data = data.slice(s![r0..=r1, c0..=c1]).to_owned();
                let gt = &mut georef.geotransform;
                gt[0] += c0 as f64 * gt[1] + r0 as f64 * gt[2];
                gt[3] += c0 as f64 * gt[4] + r0 as f64 * gt[5];
            }
            _ => {
                return Err(PipelineError::alignment(
                    "area of interest has no valid cells",
                ))
            }
        }
    }

    Ok(Raster {
        data,
        georef,
        nodata: Some(nodata),
        pixel_type: src.pixel_type,
    })
}

/// Re-orient a TRMM swath grid (stored longitude-major, south-up) to north-up rows
pub fn orient_swath(swath: &Array2<f32>) -> Array2<f32> {
    swath.t().slice(s![..;-1, ..]).to_owned()
}
