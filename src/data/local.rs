//! Offline catalog: a directory mirror of Valet JSON responses.
//!
//! Layout under `root`:
//! - `lists/groups.json`
//! - `groups/{group}.json`
//! - `observations/{series}.json`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::data::source::{GroupDetail, GroupSummary, SeriesSource, SourceError};
use crate::data::valet::{parse_group_detail, parse_groups, parse_observations};
use crate::domain::RawSeries;

#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, dir: &str, name: &str) -> Result<PathBuf, SourceError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SourceError::Config(format!("invalid catalog name '{name}'")));
        }
        Ok(self.root.join(dir).join(format!("{name}.json")))
    }

    fn read(&self, path: PathBuf) -> Result<Option<String>, SourceError> {
        tracing::debug!(path = %path.display(), "reading local catalog file");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SourceError::Io { path, source }),
        }
    }

    fn read_required(&self, path: PathBuf) -> Result<String, SourceError> {
        match self.read(path.clone())? {
            Some(text) => Ok(text),
            None => Err(SourceError::Io {
                path,
                source: std::io::Error::from(ErrorKind::NotFound),
            }),
        }
    }
}

impl SeriesSource for LocalSource {
    fn name(&self) -> &'static str {
        "local"
    }

    fn list_groups(&self) -> Result<Vec<GroupSummary>, SourceError> {
        let body = self.read_required(self.root.join("lists").join("groups.json"))?;
        parse_groups(&body)
    }

    fn group_detail(&self, group: &str) -> Result<GroupDetail, SourceError> {
        let path = self.entry_path("groups", group)?;
        match self.read(path)? {
            Some(body) => parse_group_detail(&body),
            None => Err(SourceError::UnknownGroup(group.to_string())),
        }
    }

    fn series_observations(&self, series: &str) -> Result<RawSeries, SourceError> {
        let path = self.entry_path("observations", series)?;
        let body = self.read_required(path)?;
        parse_observations(series, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("valet-series-local-{}-{tag}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("lists")).unwrap();
        fs::create_dir_all(root.join("groups")).unwrap();
        fs::create_dir_all(root.join("observations")).unwrap();

        fs::write(
            root.join("lists/groups.json"),
            r#"{"groups": {"FX": {"label": "Exchange rates", "description": "FX"}}}"#,
        )
        .unwrap();
        fs::write(
            root.join("groups/FX.json"),
            r#"{"groupDetails": {"name": "FX", "label": "Exchange rates", "description": "FX",
                "groupSeries": {"FXUSDCAD": {"label": "USD/CAD"}}}}"#,
        )
        .unwrap();
        fs::write(
            root.join("observations/FXUSDCAD.json"),
            r#"{"seriesDetail": {"FXUSDCAD": {"label": "USD/CAD", "description": "d",
                "dimension": {"key": "d", "name": "date"}}},
               "observations": [{"d": "2021-03-01", "FXUSDCAD": {"v": "1.26"}}]}"#,
        )
        .unwrap();
        root
    }

    #[test]
    fn reads_mirrored_catalog() {
        let root = fixture_dir("read");
        let source = LocalSource::new(&root);

        let groups = source.list_groups().unwrap();
        assert_eq!(groups[0].name, "FX");

        let detail = source.group_detail("FX").unwrap();
        assert_eq!(detail.series[0].name, "FXUSDCAD");

        let raw = source.series_observations("FXUSDCAD").unwrap();
        assert_eq!(raw.meta.label, "USD/CAD");
        assert_eq!(raw.observations.len(), 1);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_files_map_to_typed_errors() {
        let root = fixture_dir("missing");
        let source = LocalSource::new(&root);

        assert!(matches!(source.group_detail("NOPE"), Err(SourceError::UnknownGroup(_))));
        assert!(matches!(source.series_observations("NOPE"), Err(SourceError::Io { .. })));
        assert!(matches!(source.series_observations("../x"), Err(SourceError::Config(_))));

        let _ = fs::remove_dir_all(&root);
    }
}
