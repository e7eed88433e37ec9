//! Core statistical operations and traits
//!
//! This module defines the statistics that can be requested for a table column and the
//! NoData-aware reduction that computes them.

use crate::errors::{PipelineError, Result};
use crate::raster_io::is_nodata;
use ndarray::{ArrayBase, Data, Dimension};
use std::str::FromStr;

/// Supported statistical operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Arithmetic mean of the valid cells
    Mean,
    /// Sum of the valid cells
    Sum,
}

impl StatOperation {
    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
        }
    }
}

impl FromStr for StatOperation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            other => Err(PipelineError::UnsupportedStatistic {
                name: other.to_string(),
            }),
        }
    }
}

/// Trait for arrays that can be reduced to a single value while skipping NoData cells
pub trait MaskedReduction {
    /// Reduce every valid cell to one value
    ///
    /// Returns `None` when no cell is valid: the mean is undefined, and an empty sum
    /// is reported the same way so both columns stay comparable.
    fn masked_reduce(&self, nodata: Option<f64>, operation: StatOperation) -> Option<f64>;
}

impl<S, D> MaskedReduction for ArrayBase<S, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    fn masked_reduce(&self, nodata: Option<f64>, operation: StatOperation) -> Option<f64> {
        let (sum, count) = self
            .iter()
            .filter(|&&v| !is_nodata(v, nodata))
            .fold((0.0_f64, 0_usize), |(sum, count), &v| (sum + f64::from(v), count + 1));

        if count == 0 {
            return None;
        }
        match operation {
            StatOperation::Mean => Some(sum / count as f64),
            StatOperation::Sum => Some(sum),
        }
    }
}
