//! Read operations over the dataset.
//!
//! Each operation takes one dataset handle from the store and materializes an
//! ordered table. "Nothing matched" is always an empty table, never an error.
//! The free functions do the work on a borrowed [`Dataset`]; [`Queries`]
//! binds them to a shared [`DatasetStore`].

use crate::config::DashboardConfig;
use crate::scoring::{score, RankedTable};
use crate::store::DatasetStore;
use crate::types::{Dataset, DatasetOverview, Indicator, MetricRecord, Table};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows for `year`, ordered by the dataset's canonical company order.
pub fn year_snapshot(dataset: &Dataset, year: i32) -> Table {
    let order: HashMap<&str, usize> = dataset
        .companies
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let mut rows: Table = dataset
        .records
        .iter()
        .filter(|r| r.year == year)
        .cloned()
        .collect();
    rows.sort_by_key(|r| order.get(r.company.as_str()).copied().unwrap_or(usize::MAX));
    rows
}

pub fn latest_year_snapshot(dataset: &Dataset) -> Table {
    match dataset.latest_year() {
        Some(year) => year_snapshot(dataset, year),
        None => Table::new(),
    }
}

/// All years for `company`, ascending.
pub fn company_trend(dataset: &Dataset, company: &str) -> Table {
    let mut rows: Table = dataset
        .records
        .iter()
        .filter(|r| r.company == company)
        .cloned()
        .collect();
    rows.sort_by_key(|r| r.year);
    rows
}

/// [`company_trend`] restricted to `start..=end`.
pub fn company_trend_range(dataset: &Dataset, company: &str, start: i32, end: i32) -> Table {
    company_trend(dataset, company)
        .into_iter()
        .filter(|r| (start..=end).contains(&r.year))
        .collect()
}

/// One row per requested company that has data for `year` (the latest year
/// when `None`), in the order the companies were requested.
///
/// Row order is tied to the request, not to the dataset's company order:
/// `["C", "A", "B"]` with data for A and C yields `[C, A]`. Repeated names
/// yield one row.
pub fn multi_company_snapshot<S: AsRef<str>>(
    dataset: &Dataset,
    companies: &[S],
    year: Option<i32>,
) -> Table {
    let Some(year) = year.or_else(|| dataset.latest_year()) else {
        return Table::new();
    };
    let by_company: HashMap<&str, &MetricRecord> = dataset
        .records
        .iter()
        .filter(|r| r.year == year)
        .map(|r| (r.company.as_str(), r))
        .collect();

    let mut requested: HashSet<&str> = HashSet::new();
    let mut rows = Table::new();
    for company in companies {
        let company: &str = company.as_ref();
        if !requested.insert(company) {
            continue;
        }
        if let Some(r) = by_company.get(company) {
            rows.push((*r).clone());
        }
    }
    rows
}

pub fn overview(dataset: &Dataset) -> DatasetOverview {
    DatasetOverview {
        company_count: dataset.companies.len(),
        first_year: dataset.years.iter().min().copied(),
        last_year: dataset.latest_year(),
        indicator_count: Indicator::ALL.len(),
    }
}

/// Units per indicator key: the built-in catalog, overridden by whatever the
/// source declares. Source entries under a legacy name land on the canonical
/// key; entries for anything that is not an indicator are dropped.
pub fn units(dataset: &Dataset) -> BTreeMap<String, String> {
    let mut units: BTreeMap<String, String> = Indicator::ALL
        .iter()
        .map(|i| (i.key().to_string(), i.unit().to_string()))
        .collect();
    for (key, unit) in &dataset.units {
        match Indicator::from_key(key) {
            // the canonical entry wins over a legacy one
            Some(indicator)
                if key.as_str() != indicator.key() && dataset.units.contains_key(indicator.key()) => {}
            Some(indicator) => {
                units.insert(indicator.key().to_string(), unit.clone());
            }
            None => debug!(key = %key, "ignoring unit for unknown indicator"),
        }
    }
    units
}

/// Query layer bound to one shared store.
#[derive(Clone)]
pub struct Queries {
    store: Arc<DatasetStore>,
    max_compared_companies: usize,
    default_compared_companies: usize,
}

impl Queries {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        let defaults = DashboardConfig::default();
        Self {
            store,
            max_compared_companies: defaults.max_compared_companies,
            default_compared_companies: defaults.default_compared_companies,
        }
    }

    pub fn from_config(store: Arc<DatasetStore>, config: &DashboardConfig) -> Self {
        Self {
            store,
            max_compared_companies: config.max_compared_companies,
            default_compared_companies: config.default_compared_companies,
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        self.store.load()
    }

    pub fn companies(&self) -> Vec<String> {
        self.dataset().companies.clone()
    }

    pub fn years(&self) -> Vec<i32> {
        self.dataset().years.clone()
    }

    pub fn units(&self) -> BTreeMap<String, String> {
        units(&self.dataset())
    }

    pub fn overview(&self) -> DatasetOverview {
        overview(&self.dataset())
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.dataset().latest_year()
    }

    pub fn latest_year_snapshot(&self) -> Table {
        latest_year_snapshot(&self.dataset())
    }

    pub fn year_snapshot(&self, year: i32) -> Table {
        year_snapshot(&self.dataset(), year)
    }

    pub fn company_trend(&self, company: &str) -> Table {
        company_trend(&self.dataset(), company)
    }

    pub fn company_trend_range(&self, company: &str, start: i32, end: i32) -> Table {
        company_trend_range(&self.dataset(), company, start, end)
    }

    pub fn multi_company_snapshot<S: AsRef<str>>(&self, companies: &[S], year: Option<i32>) -> Table {
        multi_company_snapshot(&self.dataset(), companies, year)
    }

    /// Companies preselected for a comparison: the first few in display order.
    pub fn default_comparison(&self) -> Vec<String> {
        self.dataset()
            .companies
            .iter()
            .take(self.default_compared_companies)
            .cloned()
            .collect()
    }

    /// Score a comparison of at most `max_compared_companies` distinct
    /// companies, keeping the first ones requested.
    pub fn compare<S: AsRef<str>>(&self, companies: &[S], year: Option<i32>) -> RankedTable {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut selected: Vec<&str> = Vec::new();
        for company in companies {
            let company: &str = company.as_ref();
            if seen.insert(company) {
                selected.push(company);
            }
        }
        if selected.len() > self.max_compared_companies {
            warn!(
                requested = selected.len(),
                max = self.max_compared_companies,
                "comparison truncated"
            );
            selected.truncate(self.max_compared_companies);
        }
        score(&self.multi_company_snapshot(&selected, year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: &str, year: i32) -> MetricRecord {
        MetricRecord {
            company: company.to_string(),
            year,
            accident_rate: 1.0,
            fatalities: 0.0,
            safety_audit_compliance: 90.0,
            carbon_emissions: 1000.0,
            energy_consumption: 50.0,
            renewable_energy_ratio: 20.0,
            renewable_energy_amount: None,
            construction_waste: 100.0,
            recycling_rate: 80.0,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            companies: vec!["A".into(), "B".into(), "C".into()],
            years: vec![2009, 2024, 2025],
            units: BTreeMap::new(),
            records: vec![
                record("C", 2025),
                record("A", 2025),
                record("A", 2009),
                record("B", 2024),
                record("A", 2024),
            ],
        }
    }

    #[test]
    fn test_latest_year_is_numeric_max() {
        let ds = dataset();
        let rows = latest_year_snapshot(&ds);
        assert!(rows.iter().all(|r| r.year == 2025));
        let names: Vec<_> = rows.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_empty_dataset_gives_empty_tables() {
        let ds = Dataset::default();
        assert!(latest_year_snapshot(&ds).is_empty());
        assert!(company_trend(&ds, "A").is_empty());
        assert!(multi_company_snapshot(&ds, &["A"], None).is_empty());
        let o = overview(&ds);
        assert_eq!((o.company_count, o.first_year, o.last_year), (0, None, None));
    }

    #[test]
    fn test_company_trend_ascending() {
        let ds = dataset();
        let years: Vec<_> = company_trend(&ds, "A").iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2009, 2024, 2025]);
        assert!(company_trend(&ds, "Nobody").is_empty());
    }

    #[test]
    fn test_company_trend_range() {
        let ds = dataset();
        let years: Vec<_> = company_trend_range(&ds, "A", 2010, 2025)
            .iter()
            .map(|r| r.year)
            .collect();
        assert_eq!(years, vec![2024, 2025]);
        assert!(company_trend_range(&ds, "A", 2025, 2024).is_empty());
    }

    #[test]
    fn test_multi_company_snapshot_follows_request_order() {
        let ds = dataset();
        let names: Vec<_> = multi_company_snapshot(&ds, &["C", "A", "B"], Some(2025))
            .into_iter()
            .map(|r| r.company)
            .collect();
        assert_eq!(names, vec!["C", "A"]);
    }

    #[test]
    fn test_multi_company_snapshot_defaults_to_latest_and_dedupes() {
        let ds = dataset();
        let rows = multi_company_snapshot(&ds, &["A", "A", "B"], None);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].company.as_str(), rows[0].year), ("A", 2025));
    }

    #[test]
    fn test_units_merge_source_over_catalog() {
        let mut ds = dataset();
        ds.units.insert("fatalities".into(), "people".into());
        let u = units(&ds);
        assert_eq!(u.get("fatalities").map(String::as_str), Some("people"));
        assert_eq!(u.get("carbon_emissions").map(String::as_str), Some("tCO₂e"));
        assert_eq!(u.len(), 9);
    }

    #[test]
    fn test_units_drop_unknown_keys_and_map_legacy_names() {
        let mut ds = dataset();
        ds.units.insert("workers_compensation".into(), "cases".into());
        ds.units.insert("safety_inspection_compliance_rate".into(), "pct".into());
        let u = units(&ds);
        assert!(!u.contains_key("workers_compensation"));
        assert!(!u.contains_key("safety_inspection_compliance_rate"));
        assert_eq!(u.get("safety_audit_compliance").map(String::as_str), Some("pct"));
        assert_eq!(u.len(), 9);
    }

    #[test]
    fn test_overview_counts() {
        let o = overview(&dataset());
        assert_eq!(o.company_count, 3);
        assert_eq!(o.first_year, Some(2009));
        assert_eq!(o.last_year, Some(2025));
        assert_eq!(o.indicator_count, 9);
    }
}
