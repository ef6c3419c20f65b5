use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the data layer. Every field has a default so an empty or
/// missing config file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// JSON dataset to serve.
    pub data_path: PathBuf,
    /// How long a loaded dataset is served before the source is re-read.
    pub cache_ttl_secs: u64,
    /// Upper bound on companies in one comparison.
    pub max_compared_companies: usize,
    /// How many companies `default_comparison` preselects.
    pub default_compared_companies: usize,
    /// Where CSV exports are written.
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/data.json"),
            cache_ttl_secs: 300,
            max_compared_companies: 5,
            default_compared_companies: 3,
            export_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn from_toml_str(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(path, &contents)
    }

    /// Like [`DashboardConfig::load`], but a file that does not exist yields
    /// the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }
}
