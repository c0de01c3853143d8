//! Pipeline and server configuration.
//!
//! The pipeline reads an optional JSON file; any key left out keeps its
//! default:
//! ```json
//! {
//!   "repositories": [
//!     { "name": "stackflow", "url": "https://api.github.com/repos/daangn/stackflow/releases" }
//!   ],
//!   "exclude_weekends": true,
//!   "raw_path": "data/release_raw.csv",
//!   "stats_path": "data/release_stats.csv",
//!   "per_page": 100,
//!   "max_pages": 1
//! }
//! ```
//! The server is configured from environment variables.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_RAW_PATH: &str = "data/release_raw.csv";
pub const DEFAULT_STATS_PATH: &str = "data/release_stats.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

/// A repository and the releases endpoint it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoSource {
    pub name: String,
    pub url: String,
}

impl RepoSource {
    pub fn github(owner: &str, repo: &str) -> Self {
        Self {
            name: repo.to_string(),
            url: format!("https://api.github.com/repos/{owner}/{repo}/releases"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub repositories: Vec<RepoSource>,
    pub exclude_weekends: bool,
    pub raw_path: PathBuf,
    pub stats_path: PathBuf,
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repositories: vec![
                RepoSource::github("daangn", "stackflow"),
                RepoSource::github("daangn", "seed-design"),
            ],
            exclude_weekends: true,
            raw_path: PathBuf::from(DEFAULT_RAW_PATH),
            stats_path: PathBuf::from(DEFAULT_STATS_PATH),
            per_page: 100,
            max_pages: 1,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(Error::Config("no repositories configured".to_string()));
        }
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.name.is_empty() {
                return Err(Error::Config(format!("repository for {} has no name", repo.url)));
            }
            if !seen.insert(repo.name.as_str()) {
                return Err(Error::Config(format!("duplicate repository {}", repo.name)));
            }
        }
        if self.per_page == 0 || self.per_page > 100 {
            return Err(Error::Config(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        Ok(())
    }
}

/// Query service configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub bind_addr: String,
    pub raw_path: PathBuf,
    pub stats_path: PathBuf,
}

impl ServeConfig {
    /// Optional environment variables:
    /// - `RELEASE_STATS_BIND_ADDR` (default: "0.0.0.0:4000")
    /// - `RELEASE_STATS_RAW_PATH` (default: "data/release_raw.csv")
    /// - `RELEASE_STATS_STATS_PATH` (default: "data/release_stats.csv")
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.to_string());

        let config = Self {
            bind_addr: var("RELEASE_STATS_BIND_ADDR", DEFAULT_BIND_ADDR),
            raw_path: PathBuf::from(var("RELEASE_STATS_RAW_PATH", DEFAULT_RAW_PATH)),
            stats_path: PathBuf::from(var("RELEASE_STATS_STATS_PATH", DEFAULT_STATS_PATH)),
        };

        tracing::info!(
            bind_addr = %config.bind_addr,
            raw_path = %config.raw_path.display(),
            stats_path = %config.stats_path.display(),
            "configuration loaded"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(
            config.repositories[0].url,
            "https://api.github.com/repos/daangn/stackflow/releases"
        );
        assert!(config.exclude_weekends);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{"repositories":[{"name":"a","url":"https://x.test/a"}],"max_pages":3}"#,
        )
        .unwrap();

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.per_page, 100);
        assert_eq!(config.raw_path, PathBuf::from(DEFAULT_RAW_PATH));
    }

    #[test]
    fn test_rejects_empty_repositories() {
        let err = PipelineConfig::from_json(r#"{"repositories":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let json = r#"{"repositories":[
            {"name":"a","url":"https://x.test/1"},
            {"name":"a","url":"https://x.test/2"}
        ]}"#;
        assert!(PipelineConfig::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(PipelineConfig::from_json("{").is_err());
    }
}
