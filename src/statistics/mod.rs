//! Statistical reductions over raster stacks
//!
//! This module provides the NoData-aware statistics used to turn raster stacks into
//! table columns, including the trailing-window ("rolling") variant.
//!
//! # Organization
//!
//! - [`operations`]: the statistic names and the masked reduction trait
//! - [`masks`]: validity masks combined across sources

pub mod masks;
pub mod operations;

pub use masks::{combine_masks, valid_mask};
pub use operations::{MaskedReduction, StatOperation};

use crate::period::shift_months;
use crate::raster_io::RasterStack;
use chrono::NaiveDate;

/// Statistic over every valid cell of the periods in `[start, end]`
pub fn masked_statistic(
    stack: &RasterStack,
    start: NaiveDate,
    end: NaiveDate,
    operation: StatOperation,
) -> Option<f64> {
    stack
        .slice_periods(start, end)
        .masked_reduce(stack.nodata, operation)
}

/// Statistic over the `window` months immediately preceding `period` (exclusive)
pub fn rolling_statistic(
    stack: &RasterStack,
    period: NaiveDate,
    window: usize,
    operation: StatOperation,
) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let window = i32::try_from(window).ok()?;
    let start = shift_months(period, -window)?;
    let end = shift_months(period, -1)?;
    masked_statistic(stack, start, end, operation)
}
