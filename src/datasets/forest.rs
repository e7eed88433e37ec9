//! Pixel-level sample joining fire presence, land cover and distance to forest

use super::landcover::{ensure_stacks_aligned, year_layer};
use crate::classify::NON_FLAMMABLE;
use crate::errors::{PipelineError, Result};
use crate::raster_io::{is_nodata, RasterStack};
use crate::sampling::{subsample, undersample};
use crate::statistics::{combine_masks, masks::select, valid_mask};
use ndarray::{Array2, Axis, Zip};
use serde::Serialize;
use std::collections::BTreeMap;

/// One sampled pixel-year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelObservation {
    pub is_fire_pixel: u8,
    pub year: i32,
    pub lc_code: u16,
    pub forest_distance: i32,
    pub lc_name: Option<String>,
}

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOptions {
    pub sample_size: usize,
    pub seed: u64,
}

/// Yearly fire presence: 1 where the NoData-masked monthly sum is positive, 0 where it
/// is zero, `None` where every month is NoData
pub fn yearly_fire_presence(fire: &RasterStack, year: i32) -> Array2<Option<u8>> {
    let months = fire.select_year(year);
    let mut totals: Array2<Option<f64>> = Array2::from_elem(fire.grid_shape(), None);
    for layer in months.axis_iter(Axis(0)) {
        Zip::from(&mut totals).and(&layer).for_each(|t, &v| {
            if !is_nodata(v, fire.nodata) {
                *t = Some(t.unwrap_or(0.0) + f64::from(v));
            }
        });
    }
    totals.mapv(|t| t.map(|sum| u8::from(sum > 0.0)))
}

/// Every valid pixel-year before balancing
pub fn pixel_observations(
    fire: &RasterStack,
    landcover: &RasterStack,
    distance: &RasterStack,
    years: &[i32],
) -> Result<Vec<PixelObservation>> {
    ensure_stacks_aligned(fire, landcover)?;
    ensure_stacks_aligned(fire, distance)?;

    let mut rows = Vec::new();
    for &year in years {
        let presence = yearly_fire_presence(fire, year);
        let covers = year_layer(landcover, year)?;
        let distances = year_layer(distance, year)?;

        let fire_mask = presence.mapv(|p| p.is_some());
        let lc_mask = Zip::from(&valid_mask(&covers, landcover.nodata))
            .and(&covers)
            .map_collect(|&valid, &c| valid && c != f32::from(NON_FLAMMABLE));
        let distance_mask = valid_mask(&distances, distance.nodata);
        let mask = combine_masks(&[&fire_mask, &lc_mask, &distance_mask])?;

        let presence_values: Vec<u8> = presence
            .iter()
            .zip(mask.iter())
            .filter_map(|(&p, &keep)| if keep { p } else { None })
            .collect();
        let cover_values = select(&covers, &mask)?;
        let distance_values = select(&distances, &mask)?;
        if presence_values.len() != cover_values.len() || cover_values.len() != distance_values.len() {
            return Err(PipelineError::alignment(format!(
                "{year}: {} fire, {} cover and {} distance values",
                presence_values.len(),
                cover_values.len(),
                distance_values.len()
            )));
        }

        rows.extend(
            presence_values
                .into_iter()
                .zip(cover_values)
                .zip(distance_values)
                .map(|((is_fire_pixel, lc), dist)| PixelObservation {
                    is_fire_pixel,
                    year,
                    lc_code: lc as u16,
                    forest_distance: dist as i32,
                    lc_name: None,
                }),
        );
    }
    Ok(rows)
}

/// Balance fire and non-fire rows, draw a fixed-size sample and attach cover names
pub fn balanced_sample(
    rows: &[PixelObservation],
    options: SampleOptions,
    names: &BTreeMap<u16, String>,
) -> Vec<PixelObservation> {
    let balanced = undersample(rows, |r| r.is_fire_pixel, options.seed);
    log::info!(
        "Undersampled {} pixel-years to {} balanced rows",
        rows.len(),
        balanced.len()
    );
    subsample(&balanced, options.sample_size, options.seed)
        .into_iter()
        .map(|mut row| {
            row.lc_name = names.get(&row.lc_code).cloned();
            row
        })
        .collect()
}
