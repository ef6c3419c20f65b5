use std::path::PathBuf;
use thiserror::Error;

/// Why a dataset could not be read. The store turns either case into an
/// empty dataset; callers of the loader itself see the cause.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("SOURCE_UNAVAILABLE: {}: {}", .path.display(), .source)]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SOURCE_MALFORMED: {}: {}", .path.display(), .source)]
    SourceMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONFIG_READ: {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CONFIG_PARSE: {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;
