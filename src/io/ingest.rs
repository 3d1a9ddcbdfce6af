//! Raw record cleaning and normalization.
//!
//! This module turns the `{id, label}` records of one catalog series into a
//! clean `date -> value` mapping that is safe to align and export.
//!
//! Design goals:
//! - **Row-level filtering** for known catalog noise (footnote rows, sentinels)
//! - **Series-level failure** for anything else: a series is ingested whole or not at all
//! - **Explicit date strategy**: strict ISO first, then one permissive pass

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::domain::{DateStrategy, IngestStats, NormalizedSeries, RawObservation, RawSeries};
use crate::error::PipelineError;

/// Format every `id` is first tried against.
pub const STRICT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date column parsed by one of the two stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDates {
    Strict(Vec<NaiveDate>),
    Fallback(Vec<NaiveDate>),
}

impl ParsedDates {
    pub fn strategy(&self) -> DateStrategy {
        match self {
            ParsedDates::Strict(_) => DateStrategy::Strict,
            ParsedDates::Fallback(_) => DateStrategy::Fallback,
        }
    }

    pub fn into_dates(self) -> Vec<NaiveDate> {
        match self {
            ParsedDates::Strict(dates) | ParsedDates::Fallback(dates) => dates,
        }
    }
}

/// First value neither stage could read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableDate {
    pub value: String,
}

/// True when `s` has at least one ASCII digit.
///
/// The catalog interleaves textual footnote rows ("Bank holiday") with data and
/// uses non-numeric markers for suppressed values; neither carries a digit.
pub fn contains_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

/// Parse a whole date column.
///
/// Stage 1 requires every value to match [`STRICT_DATE_FORMAT`]. If any value
/// does not, stage 2 re-reads the whole column with [`parse_date_permissive`].
pub fn parse_date_column(ids: &[&str]) -> Result<ParsedDates, UnparseableDate> {
    let strict: Option<Vec<NaiveDate>> = ids
        .iter()
        .map(|s| NaiveDate::parse_from_str(s.trim(), STRICT_DATE_FORMAT).ok())
        .collect();
    if let Some(dates) = strict {
        return Ok(ParsedDates::Strict(dates));
    }

    let mut dates = Vec::with_capacity(ids.len());
    for id in ids {
        match parse_date_permissive(id) {
            Some(date) => dates.push(date),
            None => {
                return Err(UnparseableDate {
                    value: id.to_string(),
                });
            }
        }
    }
    Ok(ParsedDates::Fallback(dates))
}

/// Best-effort date parse for catalog ids that are not plain `YYYY-MM-DD`.
///
/// Accepts timestamps (time of day is discarded), a handful of common date
/// layouts, and period tokens (`2020-01`, `2020Q1`, `2020`) which map to the
/// first day of the period. Ambiguous numeric dates read month-first.
pub fn parse_date_permissive(raw: &str) -> Option<NaiveDate> {
    const DATETIME_FMTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    const DATE_FMTS: [&str; 11] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%Y%m%d",
        "%B %d, %Y",
        "%b %d, %Y",
        "%d %B %Y",
        "%d %b %Y",
        "%b %d %Y",
    ];

    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    parse_period(s)
}

/// `YYYY`, `YYYY-MM`, `YYYY/MM`, `YYYYQn`, `YYYY-Qn`, `YYYY Qn`.
fn parse_period(s: &str) -> Option<NaiveDate> {
    let year_of = |y: &str| -> Option<i32> {
        if y.len() == 4 && y.chars().all(|c| c.is_ascii_digit()) {
            y.parse().ok()
        } else {
            None
        }
    };

    if let Some(year) = year_of(s) {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    let upper = s.to_ascii_uppercase();
    if let Some((y, q)) = upper.split_once('Q') {
        let year = year_of(y.trim_end_matches(|c: char| c == '-' || c == ' '))?;
        let quarter: u32 = q.trim().parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1);
    }

    let (y, m) = s.split_once(|c: char| c == '-' || c == '/')?;
    let year = year_of(y)?;
    if m.is_empty() || m.len() > 2 || !m.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, 1)
}

fn parse_value(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Clean, parse and index one raw series.
pub fn normalize_series(series: &RawSeries) -> Result<NormalizedSeries, PipelineError> {
    let meta = &series.meta;
    let rows_read = series.observations.len();

    let mut dropped_id = 0usize;
    let mut dropped_label = 0usize;
    let mut kept: Vec<&RawObservation> = Vec::with_capacity(rows_read);
    for obs in &series.observations {
        if !contains_digit(&obs.id) {
            dropped_id += 1;
        } else if !contains_digit(&obs.label) {
            dropped_label += 1;
        } else {
            kept.push(obs);
        }
    }

    if kept.is_empty() {
        return Err(PipelineError::MalformedSeries {
            series: meta.name.clone(),
            label: meta.label.clone(),
            rows_read,
        });
    }

    let ids: Vec<&str> = kept.iter().map(|obs| obs.id.as_str()).collect();
    let parsed = parse_date_column(&ids).map_err(|e| PipelineError::DateParse {
        series: meta.name.clone(),
        label: meta.label.clone(),
        value: e.value,
    })?;
    let date_strategy = parsed.strategy();

    let mut values = BTreeMap::new();
    let mut duplicate_dates = 0usize;
    for (date, obs) in parsed.into_dates().into_iter().zip(kept) {
        let value = parse_value(&obs.label).ok_or_else(|| PipelineError::ValueParse {
            series: meta.name.clone(),
            label: meta.label.clone(),
            date,
            value: obs.label.clone(),
        })?;
        // Later rows overwrite earlier ones with the same date.
        if values.insert(date, value).is_some() {
            duplicate_dates += 1;
        }
    }

    if duplicate_dates > 0 {
        tracing::warn!(
            series = %meta.name,
            duplicate_dates,
            "repeated observation dates; keeping the last value for each"
        );
    }

    let stats = IngestStats {
        rows_read,
        dropped_id,
        dropped_label,
        duplicate_dates,
        date_strategy,
    };
    tracing::debug!(
        series = %meta.name,
        rows_read,
        rows_used = stats.rows_used(),
        dropped_id,
        dropped_label,
        strategy = ?date_strategy,
        "normalized series"
    );

    Ok(NormalizedSeries {
        name: meta.name.clone(),
        label: meta.label.clone(),
        values,
        stats,
    })
}
