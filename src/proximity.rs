//! Proximity transform: per-cell distance, in pixels, to the nearest target cell
//!
//! Euclidean distances come from an exact separable distance transform
//! (Felzenszwalb & Huttenlocher), run over columns then rows. Chebyshev distances use
//! a two-pass chamfer sweep over the 8-neighbourhood, which is exact for that metric.
//!
//! Output is an `Int16` raster whose NoData is 32767. NoData input cells are never
//! targets and stay NoData. When no target exists anywhere in the grid, or a cell lies
//! beyond `max_distance`, the cell is written as NoData as well, so downstream masking
//! drops it instead of treating it as "far away".

use crate::raster_io::{is_nodata, PixelType, Raster};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// NoData of proximity rasters (largest `Int16`)
pub const PROXIMITY_NODATA: f64 = 32767.0;

/// Squared distance standing in for "no target reachable"
const FAR: f64 = 1e20;

/// Grid distance metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Euclidean,
    Chebyshev,
}

/// Options for [`distance_to_nearest_with`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityOptions {
    pub metric: DistanceMetric,
    /// Cells farther than this many pixels become NoData
    pub max_distance: Option<f64>,
    pub nodata: f64,
}

impl Default for ProximityOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Euclidean,
            max_distance: None,
            nodata: PROXIMITY_NODATA,
        }
    }
}

/// Distance to the nearest cell whose value is one of `target_values`
pub fn distance_to_nearest(raster: &Raster, target_values: &[u16], metric: DistanceMetric) -> Raster {
    distance_to_nearest_with(
        raster,
        target_values,
        &ProximityOptions {
            metric,
            ..ProximityOptions::default()
        },
    )
}

/// [`distance_to_nearest`] with explicit options
pub fn distance_to_nearest_with(
    raster: &Raster,
    target_values: &[u16],
    options: &ProximityOptions,
) -> Raster {
    let targets = raster.data.mapv(|v| {
        !raster.is_nodata(v) && v.fract() == 0.0 && v >= 0.0 && target_values.contains(&(v as u16))
    });

    let nodata = options.nodata as f32;
    let output = if !targets.iter().any(|&t| t) {
        log::warn!("No target cells {:?} in grid; every cell is unreachable", target_values);
        Array2::from_elem(raster.data.dim(), nodata)
    } else {
        let distances = match options.metric {
            DistanceMetric::Euclidean => euclidean_transform(&targets),
            DistanceMetric::Chebyshev => chebyshev_transform(&targets),
        };
        let limit = options.max_distance.unwrap_or(f64::INFINITY);

        let mut output = distances.mapv(|d| {
            if d.is_finite() && d <= limit && d.round() < options.nodata {
                d.round() as f32
            } else {
                nodata
            }
        });
        ndarray::Zip::from(&mut output)
            .and(&raster.data)
            .for_each(|out, &input| {
                if is_nodata(input, raster.nodata) {
                    *out = nodata;
                }
            });
        output
    };

    let mut result = Raster::new(output, raster.georef.clone(), Some(options.nodata));
    result.pixel_type = PixelType::Int16;
    result
}

/// Exact squared-distance transform of a sampled function along one line
fn squared_distance_1d(f: &[f64], out: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    let intersect = |q: usize, p: usize| {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, slot) in out.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let d = q as f64 - v[k] as f64;
        *slot = d * d + f[v[k]];
    }
}

fn euclidean_transform(targets: &Array2<bool>) -> Array2<f64> {
    let mut squared = targets.mapv(|t| if t { 0.0 } else { FAR });

    for axis in [Axis(1), Axis(0)] {
        squared.axis_iter_mut(axis).into_par_iter().for_each(|mut line| {
            let f: Vec<f64> = line.iter().copied().collect();
            let mut out = vec![0.0; f.len()];
            squared_distance_1d(&f, &mut out);
            for (slot, value) in line.iter_mut().zip(out) {
                *slot = value;
            }
        });
    }

    squared.mapv(|d2| if d2 >= FAR / 2.0 { f64::INFINITY } else { d2.sqrt() })
}

fn chebyshev_transform(targets: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = targets.dim();
    let mut dist = targets.mapv(|t| if t { 0u32 } else { u32::MAX });

    let relax = |dist: &Array2<u32>, r: usize, c: usize, dr: isize, dc: isize| -> u32 {
        let (nr, nc) = (r as isize + dr, c as isize + dc);
        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
            return u32::MAX;
        }
        dist[[nr as usize, nc as usize]].saturating_add(1)
    };

    for r in 0..rows {
        for c in 0..cols {
            let best = [(-1, -1), (-1, 0), (-1, 1), (0, -1)]
                .iter()
                .map(|&(dr, dc)| relax(&dist, r, c, dr, dc))
                .min()
                .unwrap_or(u32::MAX);
            if best < dist[[r, c]] {
                dist[[r, c]] = best;
            }
        }
    }
    for r in (0..rows).rev() {
        for c in (0..cols).rev() {
            let best = [(1, 1), (1, 0), (1, -1), (0, 1)]
                .iter()
                .map(|&(dr, dc)| relax(&dist, r, c, dr, dc))
                .min()
                .unwrap_or(u32::MAX);
            if best < dist[[r, c]] {
                dist[[r, c]] = best;
            }
        }
    }

    dist.mapv(|d| if d == u32::MAX { f64::INFINITY } else { f64::from(d) })
}
