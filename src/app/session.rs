//! Selection loading and per-session memoization.
//!
//! Shared by the one-shot commands (`show`, `export`) and the interactive
//! explorer:
//! fetch -> normalize each series -> align
//!
//! The explorer keeps a [`SelectionCache`] so re-filtering or exporting the same
//! selection does not hit the catalog again.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::data::SeriesSource;
use crate::domain::{AlignedTable, IngestStats, SeriesMetadata};
use crate::error::{AppError, PipelineError};
use crate::pipeline::SeriesIngestionPipeline;

/// A normalized selection ready for filtering, preview and export.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSelection {
    /// Full aligned table (no range applied).
    pub table: AlignedTable,
    /// Metadata per column, in column order.
    pub metadata: Vec<SeriesMetadata>,
    /// Ingest bookkeeping per column, in column order.
    pub stats: Vec<IngestStats>,
}

impl LoadedSelection {
    pub fn names(&self) -> Vec<String> {
        self.metadata.iter().map(|m| m.name.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.metadata.iter().map(|m| m.label.clone()).collect()
    }
}

/// Fetch and normalize `series` (request order is column order).
pub fn load_selection(
    source: &dyn SeriesSource,
    pipeline: &SeriesIngestionPipeline,
    series: &[String],
) -> Result<LoadedSelection, AppError> {
    if series.is_empty() {
        return Err(PipelineError::EmptySelection.into());
    }

    let raw = source.fetch_selection(series)?;
    let normalized = pipeline.normalize_each(&raw)?;
    let table = pipeline.align(&normalized);

    tracing::debug!(
        source = source.name(),
        series = series.len(),
        dates = table.len(),
        "loaded selection"
    );

    Ok(LoadedSelection {
        table,
        metadata: raw.into_iter().map(|r| r.meta).collect(),
        stats: normalized.iter().map(|s| s.stats).collect(),
    })
}

/// Identity of a loaded selection: which catalog, which series (in order), as of which day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub source: String,
    pub series: Vec<String>,
    pub as_of: NaiveDate,
}

impl SelectionKey {
    pub fn new(source: &str, series: &[String], as_of: NaiveDate) -> Self {
        Self {
            source: source.to_string(),
            series: series.iter().map(|s| s.trim().to_ascii_uppercase()).collect(),
            as_of,
        }
    }

    /// Key for today's data.
    pub fn today(source: &str, series: &[String]) -> Self {
        Self::new(source, series, chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Default)]
pub struct SelectionCache {
    entries: HashMap<SelectionKey, LoadedSelection>,
    hits: usize,
    misses: usize,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached selection for `key`, running `load` only on a miss.
    ///
    /// Failed loads are not cached.
    pub fn get_or_load(
        &mut self,
        key: SelectionKey,
        load: impl FnOnce() -> Result<LoadedSelection, AppError>,
    ) -> Result<&LoadedSelection, AppError> {
        if self.entries.contains_key(&key) {
            self.hits += 1;
            tracing::info!(series = ?key.series, as_of = %key.as_of, "selection cache hit");
            return Ok(&self.entries[&key]);
        }

        self.misses += 1;
        let loaded = load()?;
        Ok(self.entries.entry(key).or_insert(loaded))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::data::{GroupDetail, GroupSummary, SeriesSummary, SourceError};
    use crate::domain::{RawObservation, RawSeries};

    /// In-memory catalog with one group and two daily series.
    pub(crate) struct FakeSource {
        pub fetches: Cell<usize>,
    }

    impl FakeSource {
        pub(crate) fn new() -> Self {
            Self { fetches: Cell::new(0) }
        }
    }

    impl SeriesSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list_groups(&self) -> Result<Vec<GroupSummary>, SourceError> {
            Ok(vec![
                GroupSummary {
                    name: "FX".to_string(),
                    label: "Exchange rates".to_string(),
                    description: "Daily exchange rates".to_string(),
                },
                GroupSummary {
                    name: "OLD".to_string(),
                    label: "delete".to_string(),
                    description: String::new(),
                },
            ])
        }

        fn group_detail(&self, group: &str) -> Result<GroupDetail, SourceError> {
            if group != "FX" {
                return Err(SourceError::UnknownGroup(group.to_string()));
            }
            Ok(GroupDetail {
                name: "FX".to_string(),
                label: "Exchange rates".to_string(),
                description: "Daily exchange rates".to_string(),
                series: vec![
                    SeriesSummary {
                        name: "FXUSDCAD".to_string(),
                        label: "USD/CAD".to_string(),
                    },
                    SeriesSummary {
                        name: "FXEURCAD".to_string(),
                        label: "EUR/CAD".to_string(),
                    },
                ],
            })
        }

        fn series_observations(&self, series: &str) -> Result<RawSeries, SourceError> {
            self.fetches.set(self.fetches.get() + 1);
            let (label, rows): (&str, &[(&str, &str)]) = match series {
                "FXUSDCAD" => (
                    "USD/CAD",
                    &[
                        ("2020-01-01", "1.30"),
                        ("2020-01-02", "1.31"),
                        ("2020-01-03", "1.32"),
                        ("Bank holiday", "n/a"),
                    ],
                ),
                "FXEURCAD" => ("EUR/CAD", &[("2020-01-02", "1.45"), ("2020-01-03", "1.46")]),
                _ => {
                    return Err(SourceError::UnknownSeries {
                        group: "FX".to_string(),
                        series: series.to_string(),
                    });
                }
            };
            Ok(RawSeries::new(
                SeriesMetadata::new(series, label, format!("{label} daily rate")),
                rows.iter().map(|(id, v)| RawObservation::new(*id, *v)).collect(),
            ))
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn load_aligns_in_request_order() {
        let source = FakeSource::new();
        let loaded = load_selection(
            &source,
            &SeriesIngestionPipeline::new(),
            &names(&["FXEURCAD", "FXUSDCAD"]),
        )
        .unwrap();

        assert_eq!(loaded.table.columns, vec!["EUR/CAD".to_string(), "USD/CAD".to_string()]);
        assert_eq!(loaded.table.dates.len(), 3);
        assert_eq!(loaded.table.rows[0], vec![None, Some(1.30)]);
        assert_eq!(loaded.names(), names(&["FXEURCAD", "FXUSDCAD"]));
        assert_eq!(loaded.stats[1].dropped_id, 1);
    }

    #[test]
    fn empty_selection_is_rejected_before_fetching() {
        let source = FakeSource::new();
        let err = load_selection(&source, &SeriesIngestionPipeline::new(), &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(source.fetches.get(), 0);
    }

    #[test]
    fn unknown_series_maps_to_usage_error() {
        let source = FakeSource::new();
        let err = load_selection(&source, &SeriesIngestionPipeline::new(), &names(&["NOPE"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cache_memoizes_by_key() {
        let source = FakeSource::new();
        let pipeline = SeriesIngestionPipeline::new();
        let mut cache = SelectionCache::new();
        let series = names(&["FXUSDCAD"]);

        let key = SelectionKey::new("fake", &series, d(2024, 5, 1));
        let first = cache
            .get_or_load(key.clone(), || load_selection(&source, &pipeline, &series))
            .unwrap()
            .clone();
        let second = cache
            .get_or_load(key, || load_selection(&source, &pipeline, &series))
            .unwrap()
            .clone();
        assert_eq!(first, second);
        assert_eq!(source.fetches.get(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        // A new day is a new source-data version.
        let next_day = SelectionKey::new("fake", &series, d(2024, 5, 2));
        cache
            .get_or_load(next_day, || load_selection(&source, &pipeline, &series))
            .unwrap();
        assert_eq!(source.fetches.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn key_normalizes_series_names_but_keeps_order() {
        let a = SelectionKey::new("fake", &names(&["fxusdcad", "FXEURCAD"]), d(2024, 1, 1));
        let b = SelectionKey::new("fake", &names(&["FXUSDCAD", " fxeurcad"]), d(2024, 1, 1));
        let c = SelectionKey::new("fake", &names(&["FXEURCAD", "FXUSDCAD"]), d(2024, 1, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let mut cache = SelectionCache::new();
        let key = SelectionKey::new("fake", &names(&["X"]), d(2024, 1, 1));
        assert!(cache.get_or_load(key, || Err(AppError::new(4, "offline"))).is_err());
        assert!(cache.is_empty());
    }
}
