//! The series ingestion pipeline.
//!
//! raw series -> per-series normalization -> alignment -> cadence
//!          -> range filter -> CSV
//!
//! Every operation is a pure function of its arguments: no network, file or
//! terminal I/O happens here, and the pipeline value itself holds only options.
//! Callers that want to reuse results across calls memoize them explicitly
//! (see `app::session::SelectionCache`).

use std::collections::HashMap;

use rayon::prelude::*;

use crate::domain::{AlignedTable, DateRange, NormalizedSeries, RawSeries, infer_frequency};
use crate::error::{PipelineError, RangeError};
use crate::io::{align_series, normalize_series, table_from_csv, table_to_csv};

/// Aligned table built from the series that survived, plus the failures of the others.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialIngest {
    pub table: AlignedTable,
    pub series: Vec<NormalizedSeries>,
    pub failures: Vec<PipelineError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesIngestionPipeline {
    infer_frequency: bool,
}

impl Default for SeriesIngestionPipeline {
    fn default() -> Self {
        Self {
            infer_frequency: true,
        }
    }
}

impl SeriesIngestionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable cadence detection on produced tables.
    pub fn with_frequency_inference(mut self, enabled: bool) -> Self {
        self.infer_frequency = enabled;
        self
    }

    /// Normalize every requested series and align them into one table.
    ///
    /// The batch is treated as one request: the first failing series fails the call.
    pub fn normalize(&self, raw: &[RawSeries]) -> Result<AlignedTable, PipelineError> {
        let series = self.normalize_each(raw)?;
        Ok(self.align(&series))
    }

    /// Normalize every requested series without aligning them.
    pub fn normalize_each(&self, raw: &[RawSeries]) -> Result<Vec<NormalizedSeries>, PipelineError> {
        if raw.is_empty() {
            return Err(PipelineError::EmptySelection);
        }
        // Series are independent (parallel); the first failure in request order wins.
        let results: Vec<Result<NormalizedSeries, PipelineError>> = raw.par_iter().map(normalize_series).collect();
        results.into_iter().collect()
    }

    /// Normalize series independently; failing series are reported, not fatal.
    ///
    /// Fails only when nothing was requested or when no series survived (with the
    /// first failure).
    pub fn normalize_partial(&self, raw: &[RawSeries]) -> Result<PartialIngest, PipelineError> {
        if raw.is_empty() {
            return Err(PipelineError::EmptySelection);
        }

        let results: Vec<Result<NormalizedSeries, PipelineError>> = raw.par_iter().map(normalize_series).collect();

        let mut series = Vec::with_capacity(raw.len());
        let mut failures = Vec::new();
        for (item, result) in raw.iter().zip(results) {
            match result {
                Ok(s) => series.push(s),
                Err(err) => {
                    tracing::warn!(series = %item.meta.name, error = %err, "dropping series from selection");
                    failures.push(err);
                }
            }
        }

        if series.is_empty() {
            return Err(failures.swap_remove(0));
        }

        Ok(PartialIngest {
            table: self.align(&series),
            series,
            failures,
        })
    }

    /// Align already-normalized series and attach the inferred cadence.
    pub fn align(&self, series: &[NormalizedSeries]) -> AlignedTable {
        let mut table = align_series(series);
        if self.infer_frequency {
            table.frequency = infer_frequency(&table.dates);
        }
        table
    }

    /// Rows with `range.start() <= date <= range.end()`.
    ///
    /// Both bounds must fall within the table's own date range; nothing is
    /// filtered when they do not.
    pub fn filter_range(&self, table: &AlignedTable, range: &DateRange) -> Result<AlignedTable, PipelineError> {
        table.validate()?;
        let (Some(min), Some(max)) = (table.min_date(), table.max_date()) else {
            return Err(RangeError::EmptyTable.into());
        };
        let (start, end) = (range.start(), range.end());

        if start > end {
            return Err(RangeError::Inverted { start, end }.into());
        }
        if start < min || start > max {
            return Err(RangeError::StartOutOfBounds { date: start, min, max }.into());
        }
        if end < min || end > max {
            return Err(RangeError::EndOutOfBounds { date: end, min, max }.into());
        }

        // The axis is sorted, so the window is one contiguous slice.
        let lo = table.dates.partition_point(|d| *d < start);
        let hi = table.dates.partition_point(|d| *d <= end);

        Ok(AlignedTable {
            dates: table.dates[lo..hi].to_vec(),
            columns: table.columns.clone(),
            rows: table.rows[lo..hi].to_vec(),
            frequency: table.frequency,
        })
    }

    /// Serialize a table as `Date,<col1>,...` CSV text.
    pub fn to_csv(
        &self,
        table: &AlignedTable,
        rename: Option<&HashMap<String, String>>,
    ) -> Result<String, PipelineError> {
        table_to_csv(table, rename)
    }

    /// Read CSV text written by [`Self::to_csv`].
    pub fn parse_csv(&self, text: &str) -> Result<AlignedTable, PipelineError> {
        let mut table = table_from_csv(text)?;
        if !self.infer_frequency {
            table.frequency = None;
        }
        Ok(table)
    }
}
