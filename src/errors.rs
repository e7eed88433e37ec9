//! Centralized error handling for tdf_fire
//!
//! Every pipeline stage returns [`Result`]; any error aborts the stage that raised it.

use std::fmt;
use std::path::PathBuf;

/// Main error type for pipeline operations
#[derive(Debug)]
pub enum PipelineError {
    /// Raster or table dimension/count mismatch
    ShapeMismatch { message: String },

    /// No source files where at least one is required
    EmptyDirectory { path: PathBuf },

    /// Aggregation requested by a name that is not recognized
    UnsupportedStatistic { name: String },

    /// Joined sources disagree in extent or row count
    AlignmentError { message: String },

    /// A period label could not be derived from a file name or date
    InvalidPeriod { message: String },

    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// CSV serialization errors
    CsvError(csv::Error),

    /// Configuration file errors
    ConfigError(serde_json::Error),

    /// Thread pool configuration error
    ThreadPoolError(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ShapeMismatch { message } => write!(f, "Shape mismatch: {}", message),
            PipelineError::EmptyDirectory { path } => {
                write!(f, "No raster files found in '{}'", path.display())
            }
            PipelineError::UnsupportedStatistic { name } => {
                write!(f, "Unsupported statistic '{}' (expected 'mean' or 'sum')", name)
            }
            PipelineError::AlignmentError { message } => write!(f, "Alignment error: {}", message),
            PipelineError::InvalidPeriod { message } => write!(f, "Invalid period: {}", message),
            PipelineError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            PipelineError::IoError(e) => write!(f, "I/O error: {}", e),
            PipelineError::ArrayError(e) => write!(f, "Array error: {}", e),
            PipelineError::CsvError(e) => write!(f, "CSV error: {}", e),
            PipelineError::ConfigError(e) => write!(f, "Configuration error: {}", e),
            PipelineError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::NetCDFError(e) => Some(e),
            PipelineError::IoError(e) => Some(e),
            PipelineError::ArrayError(e) => Some(e),
            PipelineError::CsvError(e) => Some(e),
            PipelineError::ConfigError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for PipelineError {
    fn from(error: netcdf::Error) -> Self {
        PipelineError::NetCDFError(error)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(error: ndarray::ShapeError) -> Self {
        PipelineError::ArrayError(error)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(error: csv::Error) -> Self {
        PipelineError::CsvError(error)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::ConfigError(error)
    }
}

impl PipelineError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        PipelineError::ShapeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn alignment(message: impl Into<String>) -> Self {
        PipelineError::AlignmentError {
            message: message.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
