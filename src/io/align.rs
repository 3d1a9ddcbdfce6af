//! Multi-series alignment.
//!
//! Given several normalized series, put them on one shared date axis. A series
//! that has no observation on a date gets an explicit `None` in that row; the
//! date stays on the axis.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{AlignedTable, NormalizedSeries};

/// Align series on the sorted union of their dates, one column per series in input order.
///
/// The returned table has no cadence set; see [`crate::domain::infer_frequency`].
pub fn align_series(series: &[NormalizedSeries]) -> AlignedTable {
    let all_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.values.keys().copied())
        .collect();
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let rows = dates
        .iter()
        .map(|date| series.iter().map(|s| s.values.get(date).copied()).collect())
        .collect();

    AlignedTable {
        dates,
        columns: series.iter().map(|s| s.label.clone()).collect(),
        rows,
        frequency: None,
    }
}
