//! Bank of Canada Valet API integration.
//!
//! Endpoints used (all JSON):
//! - `{base}/lists/groups/json`: every data group
//! - `{base}/groups/{group}/json`: one group and the series it contains
//! - `{base}/observations/{series}/json`: metadata and observations of one series
//!
//! The decoders are shared with [`crate::data::LocalSource`], which reads the
//! same bodies from disk.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ExplorerConfig;
use crate::data::source::{GroupDetail, GroupSummary, SeriesSource, SeriesSummary, SourceError};
use crate::domain::{RawObservation, RawSeries, SeriesMetadata};

/// Default observation dimension key when the response does not name one.
const DEFAULT_DIMENSION_KEY: &str = "d";

pub struct ValetClient {
    client: Client,
    base_url: String,
}

impl ValetClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("valet-series/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ExplorerConfig) -> Result<Self, SourceError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_text(&self, path: &str) -> Result<(StatusCode, String), SourceError> {
        let url = self.url(path);
        tracing::debug!(%url, "fetching");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|source| SourceError::Request {
            url: url.clone(),
            source,
        })?;
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok((status, body))
    }
}

impl SeriesSource for ValetClient {
    fn name(&self) -> &'static str {
        "valet"
    }

    fn list_groups(&self) -> Result<Vec<GroupSummary>, SourceError> {
        let (status, body) = self.get_text("lists/groups/json")?;
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::Status {
                url: self.url("lists/groups/json"),
                status: status.as_u16(),
            });
        }
        parse_groups(&body)
    }

    fn group_detail(&self, group: &str) -> Result<GroupDetail, SourceError> {
        let (status, body) = self.get_text(&format!("groups/{group}/json"))?;
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::UnknownGroup(group.to_string()));
        }
        parse_group_detail(&body)
    }

    fn series_observations(&self, series: &str) -> Result<RawSeries, SourceError> {
        let (status, body) = self.get_text(&format!("observations/{series}/json"))?;
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::Status {
                url: self.url(&format!("observations/{series}/json")),
                status: status.as_u16(),
            });
        }
        parse_observations(series, &body)
    }
}

#[derive(Debug, Deserialize)]
struct GroupsResponse {
    groups: BTreeMap<String, GroupEntry>,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    label: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDetailResponse {
    group_details: GroupDetailBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDetailBody {
    name: String,
    label: String,
    #[serde(default)]
    description: Option<String>,
    /// Kept in response order (`serde_json` is built with `preserve_order`).
    #[serde(default)]
    group_series: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationsResponse {
    series_detail: BTreeMap<String, SeriesDetail>,
    #[serde(default)]
    observations: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SeriesDetail {
    label: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dimension: Option<Dimension>,
}

#[derive(Debug, Deserialize)]
struct Dimension {
    key: String,
}

/// Decode a `lists/groups` body.
pub fn parse_groups(body: &str) -> Result<Vec<GroupSummary>, SourceError> {
    let resp: GroupsResponse = serde_json::from_str(body).map_err(|e| SourceError::Decode {
        what: "group list",
        message: e.to_string(),
    })?;
    Ok(resp
        .groups
        .into_iter()
        .map(|(name, entry)| GroupSummary {
            name,
            label: entry.label,
            description: entry.description.unwrap_or_default(),
        })
        .collect())
}

/// Decode a `groups/{group}` body.
pub fn parse_group_detail(body: &str) -> Result<GroupDetail, SourceError> {
    let resp: GroupDetailResponse = serde_json::from_str(body).map_err(|e| SourceError::Decode {
        what: "group detail",
        message: e.to_string(),
    })?;
    let g = resp.group_details;
    let series = g
        .group_series
        .into_iter()
        .map(|(name, value)| {
            let entry: SeriesEntry = serde_json::from_value(value).map_err(|e| SourceError::Decode {
                what: "group detail",
                message: format!("series '{name}': {e}"),
            })?;
            Ok(SeriesSummary {
                name,
                label: entry.label,
            })
        })
        .collect::<Result<Vec<_>, SourceError>>()?;
    Ok(GroupDetail {
        name: g.name,
        label: g.label,
        description: g.description.unwrap_or_default(),
        series,
    })
}

/// Decode an `observations/{series}` body into raw `{id, label}` records.
///
/// Values are passed through untouched; an observation without a value for the
/// series gets an empty label so the ingest digit filter drops it.
pub fn parse_observations(series: &str, body: &str) -> Result<RawSeries, SourceError> {
    let resp: ObservationsResponse = serde_json::from_str(body).map_err(|e| SourceError::Decode {
        what: "observations",
        message: e.to_string(),
    })?;

    let (name, detail) = resp
        .series_detail
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(series))
        .ok_or_else(|| SourceError::Decode {
            what: "observations",
            message: format!("no seriesDetail entry for '{series}'"),
        })?;

    let dim_key = detail
        .dimension
        .as_ref()
        .map(|d| d.key.as_str())
        .unwrap_or(DEFAULT_DIMENSION_KEY);

    let observations = resp
        .observations
        .iter()
        .map(|obs| RawObservation {
            id: obs.get(dim_key).map(text_of).unwrap_or_default(),
            label: obs
                .get(&name)
                .and_then(|cell| cell.get("v"))
                .map(text_of)
                .unwrap_or_default(),
        })
        .collect();

    Ok(RawSeries::new(
        SeriesMetadata::new(name, detail.label, detail.description.unwrap_or_default()),
        observations,
    ))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
