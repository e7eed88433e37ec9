//! Land-cover tables: covers of burned pixels, cover areas, and fire incidence per cover

use crate::classify::NON_FLAMMABLE;
use crate::errors::{PipelineError, Result};
use crate::raster_io::{ensure_aligned, is_nodata, RasterStack};
use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::Serialize;
use std::collections::BTreeMap;

/// Land cover of one pixel that burned during a year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirePixelCover {
    pub year: i32,
    pub code: u16,
    pub name: Option<String>,
}

/// Pixel count and share of one land cover in a year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverArea {
    pub year: i32,
    pub code: u16,
    pub pixels: usize,
    pub proportion: f64,
    pub name: Option<String>,
}

pub(crate) fn ensure_stacks_aligned(a: &RasterStack, b: &RasterStack) -> Result<()> {
    ensure_aligned((&a.georef, a.grid_shape()), (&b.georef, b.grid_shape()))
}

pub(crate) fn year_layer(stack: &RasterStack, year: i32) -> Result<ArrayView2<'_, f32>> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|jan| stack.layer(jan))
        .ok_or_else(|| PipelineError::shape(format!("no land-cover layer for {year}")))
}

/// Land-cover code of a valid flammable cell
fn flammable_code(value: f32, nodata: Option<f64>) -> Option<u16> {
    if is_nodata(value, nodata) || value < 0.0 || value.fract() != 0.0 {
        return None;
    }
    let code = value as u16;
    (code != NON_FLAMMABLE).then_some(code)
}

/// Cells that recorded at least one fire during `year`
pub(crate) fn burned_during(fire: &RasterStack, year: i32) -> Array2<bool> {
    let months = fire.select_year(year);
    let (rows, cols) = fire.grid_shape();
    let mut burned = Array2::from_elem((rows, cols), false);
    for layer in months.axis_iter(Axis(0)) {
        Zip::from(&mut burned).and(&layer).for_each(|b, &v| {
            *b |= v != 0.0 && !is_nodata(v, fire.nodata);
        });
    }
    burned
}

/// Land cover of every pixel that burned at least once in each year, excluding
/// non-flammable and NoData covers
pub fn landcover_per_fire_pixel(
    fire: &RasterStack,
    landcover: &RasterStack,
    years: &[i32],
    names: &BTreeMap<u16, String>,
) -> Result<Vec<FirePixelCover>> {
    ensure_stacks_aligned(fire, landcover)?;

    let mut rows = Vec::new();
    for &year in years {
        let burned = burned_during(fire, year);
        let covers = year_layer(landcover, year)?;
        let before = rows.len();
        for (&cell, &hit) in covers.iter().zip(burned.iter()) {
            if !hit {
                continue;
            }
            if let Some(code) = flammable_code(cell, landcover.nodata) {
                rows.push(FirePixelCover {
                    year,
                    code,
                    name: names.get(&code).cloned(),
                });
            }
        }
        log::debug!("{}: {} burned pixels with a flammable cover", year, rows.len() - before);
    }
    Ok(rows)
}

/// Valid flammable cell count per cover code
fn cover_counts(covers: ArrayView2<'_, f32>, nodata: Option<f64>) -> BTreeMap<u16, usize> {
    let mut counts = BTreeMap::new();
    for &cell in covers.iter() {
        if let Some(code) = flammable_code(cell, nodata) {
            *counts.entry(code).or_insert(0) += 1;
        }
    }
    counts
}

/// Pixel count and proportion of every flammable cover, per year
pub fn landcover_normalized_area(
    landcover: &RasterStack,
    years: &[i32],
    names: &BTreeMap<u16, String>,
) -> Result<Vec<CoverArea>> {
    let mut rows = Vec::new();
    for &year in years {
        let counts = cover_counts(year_layer(landcover, year)?, landcover.nodata);
        let total: usize = counts.values().sum();
        rows.extend(counts.into_iter().map(|(code, pixels)| CoverArea {
            year,
            code,
            pixels,
            proportion: pixels as f64 / total as f64,
            name: names.get(&code).cloned(),
        }));
    }
    Ok(rows)
}

/// Monthly fire pixels in each named cover divided by that cover's pixel count
///
/// Returns one row per month with one entry per name in `names` (ascending code
/// order). A cover absent from the year's map has no proportion.
pub fn fire_proportion_per_landcover(
    fire: &RasterStack,
    landcover: &RasterStack,
    months: &[NaiveDate],
    names: &BTreeMap<u16, String>,
) -> Result<Vec<(NaiveDate, Vec<Option<f64>>)>> {
    ensure_stacks_aligned(fire, landcover)?;

    let mut rows = Vec::with_capacity(months.len());
    for &month in months {
        let fire_layer = fire
            .layer(month)
            .ok_or_else(|| PipelineError::alignment(format!("no fire layer for {month}")))?;
        let covers = year_layer(landcover, month.year())?;
        let counts = cover_counts(covers, landcover.nodata);

        let mut fire_sums: BTreeMap<u16, f64> = BTreeMap::new();
        Zip::from(&fire_layer).and(&covers).for_each(|&f, &c| {
            if f != 0.0 && !is_nodata(f, fire.nodata) && !is_nodata(c, landcover.nodata) {
                *fire_sums.entry(c as u16).or_insert(0.0) += f64::from(f);
            }
        });

        let proportions = names
            .keys()
            .map(|code| {
                let pixels = counts.get(code).copied().unwrap_or(0);
                (pixels > 0).then(|| fire_sums.get(code).copied().unwrap_or(0.0) / pixels as f64)
            })
            .collect();
        rows.push((month, proportions));
    }
    Ok(rows)
}
