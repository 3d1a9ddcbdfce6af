//! Runtime configuration for the `valet` binary.
//!
//! Values come from the environment (a `.env` file is loaded first) and can be
//! overridden by command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::data::{LocalSource, SeriesSource, SourceError, ValetClient};

pub const DEFAULT_BASE_URL: &str = "https://www.bankofcanada.ca/valet";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// When set, the catalog is read from this directory instead of the API.
    pub offline_dir: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            offline_dir: None,
            log_filter: None,
        }
    }
}

impl ExplorerConfig {
    pub fn from_env() -> Result<Self, SourceError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in `from_env`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SourceError> {
        let mut config = Self::default();

        if let Some(url) = lookup("VALET_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("VALET_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SourceError::Config(format!("VALET_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"))
            })?;
            if secs == 0 {
                return Err(SourceError::Config("VALET_TIMEOUT_SECS must be positive".to_string()));
            }
            config.timeout = Duration::from_secs(secs);
        }
        config.offline_dir = lookup("VALET_OFFLINE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.log_filter = lookup("VALET_LOG").filter(|v| !v.trim().is_empty());

        Ok(config)
    }

    pub fn with_offline_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.offline_dir = dir;
        }
        self
    }
}

/// Pick the catalog implementation the config asks for.
pub fn open_source(config: &ExplorerConfig) -> Result<Box<dyn SeriesSource>, SourceError> {
    match &config.offline_dir {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "using local catalog mirror");
            Ok(Box::new(LocalSource::new(dir.clone())))
        }
        None => {
            tracing::debug!(base_url = %config.base_url, "using Valet API");
            Ok(Box::new(ValetClient::from_config(config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ExplorerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ExplorerConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn reads_overrides() {
        let config = ExplorerConfig::from_lookup(lookup(&[
            ("VALET_BASE_URL", "http://localhost:8080/valet"),
            ("VALET_TIMEOUT_SECS", "5"),
            ("VALET_OFFLINE_DIR", "/tmp/mirror"),
            ("VALET_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/valet");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.offline_dir, Some(PathBuf::from("/tmp/mirror")));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(ExplorerConfig::from_lookup(lookup(&[("VALET_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ExplorerConfig::from_lookup(lookup(&[("VALET_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn flag_overrides_env_only_when_given() {
        let config = ExplorerConfig {
            offline_dir: Some(PathBuf::from("env")),
            ..ExplorerConfig::default()
        };
        let kept = config.clone().with_offline_dir(None);
        assert_eq!(kept.offline_dir, Some(PathBuf::from("env")));
        let replaced = config.with_offline_dir(Some(PathBuf::from("flag")));
        assert_eq!(replaced.offline_dir, Some(PathBuf::from("flag")));
    }

    #[test]
    fn offline_dir_selects_local_source() {
        let config = ExplorerConfig::default().with_offline_dir(Some(PathBuf::from("mirror")));
        let source = open_source(&config).unwrap();
        assert_eq!(source.name(), "local");
    }
}
