//! Error types.
//!
//! - [`PipelineError`] / [`RangeError`]: typed failures of the ingestion pipeline
//! - [`AppError`]: what the `valet` binary reports (message + process exit code)
//!
//! Exit codes used by the binary:
//! - `2`: usage, selection or date-range problems
//! - `3`: the selected series are not usable (malformed rows, unparseable dates)
//! - `4`: data source, network or file problems

use chrono::NaiveDate;
use thiserror::Error;

use crate::data::SourceError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let exit_code = match err {
            PipelineError::EmptySelection | PipelineError::Range(_) => 2,
            PipelineError::MalformedSeries { .. }
            | PipelineError::DateParse { .. }
            | PipelineError::ValueParse { .. }
            | PipelineError::InvalidTable(_) => 3,
            PipelineError::Csv(_) | PipelineError::CsvRow { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl From<RangeError> for AppError {
    fn from(err: RangeError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        let exit_code = match err {
            SourceError::UnknownGroup(_) | SourceError::UnknownSeries { .. } => 2,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

/// Failures raised by the ingestion pipeline.
///
/// Every variant carries enough context (series identity, offending value) for
/// the host to build a user-facing message. None of them are transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("at least one time series must be selected")]
    EmptySelection,

    #[error("series '{label}' ({series}) has no usable observations: all {rows_read} rows were footnotes or sentinel values")]
    MalformedSeries {
        series: String,
        label: String,
        rows_read: usize,
    },

    #[error("series '{label}' ({series}): unrecognized date '{value}'")]
    DateParse {
        series: String,
        label: String,
        value: String,
    },

    #[error("series '{label}' ({series}): value '{value}' on {date} is not a number")]
    ValueParse {
        series: String,
        label: String,
        date: NaiveDate,
        value: String,
    },

    #[error("malformed table: {0}")]
    InvalidTable(String),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("CSV line {line}: {message}")]
    CsvRow { line: usize, message: String },
}

impl PipelineError {
    /// Catalog name of the series this error is about, if any.
    pub fn series(&self) -> Option<&str> {
        match self {
            PipelineError::MalformedSeries { series, .. }
            | PipelineError::DateParse { series, .. }
            | PipelineError::ValueParse { series, .. } => Some(series),
            _ => None,
        }
    }
}

/// A requested date window that cannot be applied to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("the table has no dates to filter")]
    EmptyTable,

    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("start date {date} must be within the time series range of {min} to {max}")]
    StartOutOfBounds {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },

    #[error("end date {date} must be within the time series range of {min} to {max}")]
    EndOutOfBounds {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },
}
