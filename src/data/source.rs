//! Catalog access seam.
//!
//! The ingestion pipeline only needs `RawSeries` values; where they come from
//! (HTTP, a local mirror, test fixtures) is decided by the host through this trait.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RawSeries;

/// Label the catalog uses for retired placeholder groups.
const HIDDEN_GROUP_LABEL: &str = "delete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub name: String,
    pub label: String,
    pub description: String,
    pub series: Vec<SeriesSummary>,
}

impl GroupDetail {
    /// Resolve a series of this group by catalog name or by display label.
    pub fn find_series(&self, key: &str) -> Result<&SeriesSummary, SourceError> {
        let key = key.trim();
        self.series
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
            .or_else(|| self.series.iter().find(|s| s.label == key))
            .ok_or_else(|| SourceError::UnknownSeries {
                group: self.name.clone(),
                series: key.to_string(),
            })
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected {what} response: {message}")]
    Decode { what: &'static str, message: String },

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown data group '{0}'")]
    UnknownGroup(String),

    #[error("series '{series}' is not part of group '{group}'")]
    UnknownSeries { group: String, series: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// A catalog of groups and series.
pub trait SeriesSource {
    /// Short identifier used in logs and cache keys.
    fn name(&self) -> &'static str;

    fn list_groups(&self) -> Result<Vec<GroupSummary>, SourceError>;

    fn group_detail(&self, group: &str) -> Result<GroupDetail, SourceError>;

    fn series_observations(&self, series: &str) -> Result<RawSeries, SourceError>;

    /// Fetch several series in request order.
    fn fetch_selection(&self, series: &[String]) -> Result<Vec<RawSeries>, SourceError> {
        series.iter().map(|s| self.series_observations(s)).collect()
    }
}

/// Groups worth showing to a user, sorted by label.
pub fn visible_groups(mut groups: Vec<GroupSummary>) -> Vec<GroupSummary> {
    groups.retain(|g| g.label.trim() != HIDDEN_GROUP_LABEL);
    groups.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
    groups
}
