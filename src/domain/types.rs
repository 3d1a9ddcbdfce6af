//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - handed over by any data source (HTTP, local mirror, test fixtures)
//! - rendered as tables/charts by the host
//! - exported to CSV/JSON

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Frequency;
use crate::error::{PipelineError, RangeError};

/// One record of a source series, exactly as the catalog returned it.
///
/// `id` is date-like and `label` is number-like, but the catalog interleaves
/// footnote rows and sentinel values, so neither is guaranteed well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    pub id: String,
    pub label: String,
}

impl RawObservation {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Catalog metadata for one series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Stable catalog identifier (e.g. `FXUSDCAD`).
    pub name: String,
    /// Human-readable display name (e.g. `USD/CAD`).
    pub label: String,
    pub description: String,
}

impl SeriesMetadata {
    pub fn new(name: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Metadata plus the raw records of one requested series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSeries {
    pub meta: SeriesMetadata,
    pub observations: Vec<RawObservation>,
}

impl RawSeries {
    pub fn new(meta: SeriesMetadata, observations: Vec<RawObservation>) -> Self {
        Self { meta, observations }
    }
}

/// Which stage of the two-stage date parse produced a series' date axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStrategy {
    /// Every kept `id` matched `YYYY-MM-DD`.
    Strict,
    /// At least one `id` did not, and the permissive parser handled all of them.
    Fallback,
}

/// Row bookkeeping for one normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub rows_read: usize,
    /// Rows dropped because `id` had no digit (footnotes).
    pub dropped_id: usize,
    /// Rows dropped because `label` had no digit (sentinels).
    pub dropped_label: usize,
    /// Rows that overwrote an earlier row with the same date.
    pub duplicate_dates: usize,
    pub date_strategy: DateStrategy,
}

impl IngestStats {
    pub fn rows_used(&self) -> usize {
        self.rows_read - self.dropped_id - self.dropped_label - self.duplicate_dates
    }
}

/// A single cleaned series: calendar date -> value, one value per date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub name: String,
    /// Column identity in aligned tables and exports.
    pub label: String,
    pub values: BTreeMap<NaiveDate, f64>,
    pub stats: IngestStats,
}

/// Several series on one shared, sorted date axis.
///
/// `rows[i]` holds the values for `dates[i]`, one slot per entry of `columns`.
/// A series without an observation on that date has `None` in its slot; the
/// date itself is never dropped from the axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
    /// Best-effort cadence of `dates`; informational only.
    pub frequency: Option<Frequency>,
}

impl AlignedTable {
    /// Build a table, checking the axis order and the row shape.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
        frequency: Option<Frequency>,
    ) -> Result<Self, PipelineError> {
        let table = Self {
            dates,
            columns,
            rows,
            frequency,
        };
        table.validate()?;
        Ok(table)
    }

    /// Dates strictly increasing, one row per date, one slot per column.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(pair) = self.dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PipelineError::InvalidTable(format!(
                "date {} is not after {}",
                pair[1], pair[0]
            )));
        }
        if self.rows.len() != self.dates.len() {
            return Err(PipelineError::InvalidTable(format!(
                "{} rows for {} dates",
                self.rows.len(),
                self.dates.len()
            )));
        }
        if let Some((idx, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
        {
            return Err(PipelineError::InvalidTable(format!(
                "row for {} has {} values for {} columns",
                self.dates[idx],
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// `(date, value)` pairs of one column, in date order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates
            .iter()
            .zip(self.rows.iter())
            .map(move |(d, row)| (*d, row.get(idx).copied().flatten()))
    }

    /// Number of missing slots per column.
    pub fn missing_counts(&self) -> Vec<usize> {
        (0..self.columns.len())
            .map(|idx| self.rows.iter().filter(|row| row.get(idx).copied().flatten().is_none()).count())
            .collect()
    }

    /// Finite min/max across every present value.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in self.rows.iter().flatten().flatten() {
            min = min.min(*v);
            max = max.max(*v);
        }
        if min.is_finite() && max.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }
}

/// An inclusive `[start, end]` window of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The table's own bounds, or `None` for an empty table.
    pub fn full(table: &AlignedTable) -> Option<Self> {
        Some(Self {
            start: table.min_date()?,
            end: table.max_date()?,
        })
    }

    /// Window covering the last `n` dates of the table (at least one).
    pub fn trailing(table: &AlignedTable, n: usize) -> Option<Self> {
        let end = table.max_date()?;
        let n = n.clamp(1, table.len());
        Some(Self {
            start: table.dates[table.len() - n],
            end,
        })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
