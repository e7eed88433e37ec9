//! Period indexes and date stamps
//!
//! Raster stacks are indexed by the first day of their period: the first of the month
//! for monthly products and the first of January for annual ones.

use crate::errors::{PipelineError, Result};
use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Month starts from `start` to `end`, both inclusive
pub fn monthly_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut periods = Vec::new();
    let mut current = month_start(start);
    while current <= end {
        periods.push(current);
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    periods
}

/// January firsts from `first_year` to `last_year`, both inclusive
pub fn yearly_range(first_year: i32, last_year: i32) -> Vec<NaiveDate> {
    (first_year..=last_year)
        .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .collect()
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shift a date by a signed number of months
pub fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Number of days in a calendar month
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        PipelineError::InvalidPeriod {
            message: format!("{year}-{month:02} is not a valid month"),
        }
    })?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| PipelineError::InvalidPeriod {
            message: format!("{year}-{month:02} is out of range"),
        })?;
    Ok((next - first).num_days() as u32)
}

/// Convert a year and day of year to the calendar month (1-12), honouring leap years
pub fn doy_to_month(year: i32, doy: u32) -> Result<u32> {
    NaiveDate::from_yo_opt(year, doy)
        .map(|date| date.month())
        .ok_or_else(|| PipelineError::InvalidPeriod {
            message: format!("day {doy} does not exist in {year}"),
        })
}

static YEAR_DOY: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]{7}").expect("YYYYDDD pattern"));
static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]{6}").expect("YYYYMM pattern"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]{4}").expect("YYYY pattern"));

/// First match of a date stamp pattern in a file name
fn stamp<'a>(pattern: &Regex, name: &'a str) -> Option<&'a str> {
    pattern.find(name).map(|m| m.as_str())
}

/// Parse the `YYYYDDD` acquisition stamp MODIS products carry in their file names
pub fn parse_year_doy(file_name: &str) -> Result<(i32, u32)> {
    let stamp = stamp(&YEAR_DOY, file_name).ok_or_else(|| PipelineError::InvalidPeriod {
        message: format!("no YYYYDDD stamp in '{file_name}'"),
    })?;
    let year = stamp[..4].parse::<i32>().map_err(|e| PipelineError::InvalidPeriod {
        message: format!("bad year in '{file_name}': {e}"),
    })?;
    let doy = stamp[4..].parse::<u32>().map_err(|e| PipelineError::InvalidPeriod {
        message: format!("bad day of year in '{file_name}': {e}"),
    })?;
    Ok((year, doy))
}

/// Parse the `YYYYMM` stamp (first six digits of an eight digit run) of TRMM files
pub fn parse_year_month(file_name: &str) -> Result<(i32, u32)> {
    let stamp = stamp(&YEAR_MONTH, file_name).ok_or_else(|| PipelineError::InvalidPeriod {
        message: format!("no YYYYMM stamp in '{file_name}'"),
    })?;
    let year = stamp[..4].parse::<i32>().ok();
    let month = stamp[4..].parse::<u32>().ok().filter(|m| (1..=12).contains(m));
    match (year, month) {
        (Some(year), Some(month)) => Ok((year, month)),
        _ => Err(PipelineError::InvalidPeriod {
            message: format!("bad YYYYMM stamp in '{file_name}'"),
        }),
    }
}

/// Parse the first four-digit year in a file name
pub fn parse_year(file_name: &str) -> Result<i32> {
    stamp(&YEAR, file_name)
        .and_then(|stamp| stamp.parse::<i32>().ok())
        .ok_or_else(|| PipelineError::InvalidPeriod {
            message: format!("no year in '{file_name}'"),
        })
}

/// Check that an index is strictly increasing (which also rules out duplicates)
pub fn is_strictly_increasing(periods: &[NaiveDate]) -> bool {
    periods.windows(2).all(|pair| pair[0] < pair[1])
}
