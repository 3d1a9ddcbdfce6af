//! Reporting utilities: per-column summaries and formatted terminal output.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::AlignedTable;

pub mod format;

pub use format::*;

/// Quick facts about one column of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub label: String,
    pub present: usize,
    pub missing: usize,
    pub first: Option<(NaiveDate, f64)>,
    pub last: Option<(NaiveDate, f64)>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Summarize every column of `table`, in column order.
pub fn summarize_columns(table: &AlignedTable) -> Vec<ColumnSummary> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let present: Vec<(NaiveDate, f64)> = table
                .column_values(idx)
                .filter_map(|(d, v)| v.map(|v| (d, v)))
                .collect();
            let min = present.iter().map(|(_, v)| *v).reduce(f64::min);
            let max = present.iter().map(|(_, v)| *v).reduce(f64::max);
            ColumnSummary {
                label: label.clone(),
                present: present.len(),
                missing: table.len() - present.len(),
                first: present.first().copied(),
                last: present.last().copied(),
                min,
                max,
            }
        })
        .collect()
}
