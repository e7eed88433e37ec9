//! Area-level monthly summaries: one row per month, one column per product statistic

use crate::errors::{PipelineError, Result};
use crate::raster_io::RasterStack;
use crate::statistics::{masked_statistic, rolling_statistic, StatOperation};
use chrono::NaiveDate;

/// How one product becomes one or two table columns
#[derive(Debug, Clone)]
pub struct AreaColumn<'a> {
    pub name: String,
    pub stack: &'a RasterStack,
    pub operation: StatOperation,
    /// Also emit `<name>_prev` over the trailing window
    pub rolling: bool,
    /// Multiplier applied to the statistic (e.g. the EVI scaling factor)
    pub scale: f64,
}

impl<'a> AreaColumn<'a> {
    /// Build a column from a statistic name; unknown names are rejected
    pub fn new(name: &str, stack: &'a RasterStack, statistic: &str, rolling: bool) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            stack,
            operation: statistic.parse()?,
            rolling,
            scale: 1.0,
        })
    }

    #[must_use]
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// A summary table: column names plus one row of optional measurements per period
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTable {
    pub columns: Vec<String>,
    pub periods: Vec<NaiveDate>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl AreaTable {
    /// Value of a named column at a row
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r[idx])
    }

    /// Header and stringified records, with the period as a leading `date` column
    pub fn to_records(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut header = vec!["date".to_string()];
        header.extend(self.columns.iter().cloned());
        let records = self
            .periods
            .iter()
            .zip(&self.rows)
            .map(|(period, row)| {
                let mut record = vec![period.format("%Y-%m-%d").to_string()];
                record.extend(row.iter().map(|v| crate::table::field(*v)));
                record
            })
            .collect();
        (header, records)
    }
}

/// Summarize each product over the whole area for every period in `periods`
pub fn summarize_area(
    periods: &[NaiveDate],
    columns: &[AreaColumn<'_>],
    window: usize,
) -> Result<AreaTable> {
    let mut names = Vec::new();
    for column in columns {
        names.push(column.name.clone());
        if column.rolling {
            names.push(format!("{}_prev", column.name));
        }
    }

    let mut rows = Vec::with_capacity(periods.len());
    for &period in periods {
        let mut row = Vec::with_capacity(names.len());
        for column in columns {
            if column.stack.layer(period).is_none() {
                return Err(PipelineError::alignment(format!(
                    "column '{}' has no layer for {}",
                    column.name, period
                )));
            }
            let scale = |v: f64| v * column.scale;
            row.push(masked_statistic(column.stack, period, period, column.operation).map(scale));
            if column.rolling {
                row.push(
                    rolling_statistic(column.stack, period, window, column.operation).map(scale),
                );
            }
        }
        rows.push(row);
    }

    log::info!("Summarized {} periods into {} columns", rows.len(), names.len());
    Ok(AreaTable {
        columns: names,
        periods: periods.to_vec(),
        rows,
    })
}
