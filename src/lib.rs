//! Data access and scoring layer for the construction-company ESG dashboard.
//!
//! [`store::DatasetStore`] loads and caches the JSON dataset,
//! [`queries::Queries`] reshapes it into per-company / per-year tables and
//! [`scoring::score`] ranks a comparison set.
pub mod config;
pub mod error;
pub mod loader;
pub mod observability;
pub mod output;
pub mod projector;
pub mod queries;
pub mod scoring;
pub mod store;
pub mod types;
pub mod util;

pub use config::DashboardConfig;
pub use error::{ConfigError, LoadError};
pub use queries::Queries;
pub use scoring::{score, RankedTable};
pub use store::{Clock, DatasetStore, SystemClock};
pub use types::{Dataset, MetricRecord, ScoredRow, Table};
