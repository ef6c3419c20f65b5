//! Time-bounded cache around the dataset source.
//!
//! The store owns one shared [`Dataset`] handle. `load` serves it until the
//! TTL (measured from the last successful load) runs out, then re-reads the
//! source on the calling thread. There is no background refresh.

use crate::config::DashboardConfig;
use crate::loader::load_dataset;
use crate::types::Dataset;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Wall-clock source for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone)]
struct CacheEntry {
    dataset: Arc<Dataset>,
    loaded_at: DateTime<Utc>,
}

pub struct DatasetStore {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<CacheEntry>>,
    /// Held while re-reading the source so concurrent misses read it once.
    refresh: Mutex<()>,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(path, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.data_path.clone(), config.cache_ttl())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time of the last successful load still held by the cache.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.read_cache().as_ref().map(|e| e.loaded_at)
    }

    /// Drop the cached dataset; the next `load` re-reads the source.
    pub fn invalidate(&self) {
        *self.write_cache() = None;
        debug!(path = %self.path.display(), "dataset cache invalidated");
    }

    /// Current dataset. Never fails: an unreadable or malformed source yields
    /// an empty dataset, and that failure is not cached.
    pub fn load(&self) -> Arc<Dataset> {
        if let Some(dataset) = self.fresh() {
            return dataset;
        }

        let _guard = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have refreshed while we waited.
        if let Some(dataset) = self.fresh() {
            return dataset;
        }

        debug!(path = %self.path.display(), "loading dataset");
        match load_dataset(&self.path) {
            Ok((dataset, report)) => {
                info!(
                    path = %self.path.display(),
                    variant = ?report.variant,
                    records = report.loaded_records,
                    skipped = report.skipped_records,
                    duplicates = report.duplicate_records,
                    companies = dataset.companies.len(),
                    years = dataset.years.len(),
                    "dataset loaded"
                );
                let entry = CacheEntry {
                    dataset: Arc::new(dataset),
                    loaded_at: self.clock.now(),
                };
                let dataset = Arc::clone(&entry.dataset);
                *self.write_cache() = Some(entry);
                dataset
            }
            Err(err) => {
                warn!(error = %err, "dataset unavailable, serving empty dataset");
                *self.write_cache() = None;
                Arc::new(Dataset::default())
            }
        }
    }

    fn fresh(&self) -> Option<Arc<Dataset>> {
        let cache = self.read_cache();
        let entry = cache.as_ref()?;
        // A clock that stepped backwards keeps the entry alive.
        let age = (self.clock.now() - entry.loaded_at).to_std().unwrap_or_default();
        if age < self.ttl {
            Some(Arc::clone(&entry.dataset))
        } else {
            debug!(age_secs = age.as_secs(), "dataset cache expired");
            None
        }
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, Option<CacheEntry>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, Option<CacheEntry>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
