use crate::error::{LoadError, LoadResult};
use crate::projector::{identity, project};
use crate::types::{Dataset, MetricRecord, RawNumber, RawRecord};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const METADATA_KEY: &str = "metadata";
const NESTED_COMPANIES_KEY: &str = "companies";

/// Which of the two historical file layouts a source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    /// `{"<id>": {"company_name", "year", ...}, "metadata": {...}}`
    Flat,
    /// `{"companies": {"<company>": {"<year>": {"safety": {...}, "environment": {...}}}}}`
    Nested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub variant: SchemaVariant,
    pub total_records: usize,
    pub loaded_records: usize,
    pub skipped_records: usize,
    pub duplicate_records: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    companies: Vec<String>,
    #[serde(default)]
    years: Vec<RawNumber>,
    #[serde(default)]
    units: BTreeMap<String, String>,
}

/// Category groups of the nested layout, in the order they are merged.
const NESTED_GROUPS: [&[&str]; 2] = [&["safety"], &["environment", "environmental"]];

pub fn detect_variant(root: &Map<String, Value>) -> SchemaVariant {
    match root.get(NESTED_COMPANIES_KEY) {
        Some(Value::Object(_)) => SchemaVariant::Nested,
        _ => SchemaVariant::Flat,
    }
}

pub fn load_dataset(path: &Path) -> LoadResult<(Dataset, LoadReport)> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(&contents).map_err(|source| LoadError::SourceMalformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a JSON document in either layout into a [`Dataset`].
///
/// Only a document that is not a JSON object fails; individual records that
/// do not name a company and a year are skipped and counted.
pub fn parse_dataset(json: &str) -> Result<(Dataset, LoadReport), serde_json::Error> {
    let root: Map<String, Value> = serde_json::from_str(json)?;
    let variant = detect_variant(&root);

    let metadata = match root.get(METADATA_KEY) {
        Some(v) => RawMetadata::deserialize(v).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable metadata block");
            RawMetadata::default()
        }),
        None => RawMetadata::default(),
    };

    let raw = match variant {
        SchemaVariant::Flat => flat_records(&root),
        SchemaVariant::Nested => nested_records(&root),
    };

    let total_records = raw.len();
    let mut skipped_records = 0usize;
    let mut duplicate_records = 0usize;
    let mut seen: HashSet<(String, i32)> = HashSet::new();
    let mut records: Vec<MetricRecord> = Vec::new();

    for (key, result) in raw {
        let raw = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(record = %key, error = %e, "skipping unparseable record");
                skipped_records += 1;
                continue;
            }
        };
        let Some((company, year)) = identity(&raw) else {
            debug!(record = %key, "skipping record without company or year");
            skipped_records += 1;
            continue;
        };
        if !seen.insert((company.to_string(), year)) {
            warn!(record = %key, company, year, "duplicate company/year record dropped");
            duplicate_records += 1;
            continue;
        }
        records.push(project(&raw));
    }

    let dataset = assemble(metadata, records);
    let report = LoadReport {
        variant,
        total_records,
        loaded_records: dataset.records.len(),
        skipped_records,
        duplicate_records,
    };
    Ok((dataset, report))
}

fn flat_records(root: &Map<String, Value>) -> Vec<(String, Result<RawRecord, serde_json::Error>)> {
    root.iter()
        .filter(|(key, _)| key.as_str() != METADATA_KEY)
        .map(|(key, value)| {
            let record = match value {
                Value::Object(map) => Ok(RawRecord::from_map(map)),
                _ => Err(not_an_object(key)),
            };
            (key.clone(), record)
        })
        .collect()
}

fn nested_records(root: &Map<String, Value>) -> Vec<(String, Result<RawRecord, serde_json::Error>)> {
    let Some(Value::Object(companies)) = root.get(NESTED_COMPANIES_KEY) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (company, years) in companies {
        let Value::Object(years) = years else {
            out.push((company.clone(), Err(not_an_object(company))));
            continue;
        };
        for (year, groups) in years {
            let key = format!("{}/{}", company, year);
            let Value::Object(groups) = groups else {
                out.push((key.clone(), Err(not_an_object(&key))));
                continue;
            };
            let mut flat = Map::new();
            for names in NESTED_GROUPS {
                let group = names
                    .iter()
                    .filter_map(|n| groups.get(*n))
                    .find_map(Value::as_object);
                if let Some(group) = group {
                    flat.extend(group.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            flat.insert("company_name".to_string(), Value::String(company.clone()));
            flat.insert("year".to_string(), Value::String(year.clone()));
            out.push((key, Ok(RawRecord::from_map(&flat))));
        }
    }
    out
}

fn not_an_object(key: &str) -> serde_json::Error {
    serde::de::Error::custom(format!("{} is not an object", key))
}

/// Company order comes from the metadata when it has one, followed by any
/// company that only appears in the records. Years are the union of both,
/// ascending.
fn assemble(metadata: RawMetadata, records: Vec<MetricRecord>) -> Dataset {
    let mut companies: Vec<String> = Vec::new();
    let mut known: HashSet<String> = HashSet::new();
    let listed = metadata.companies.into_iter().map(|c| c.trim().to_string());
    let found = records.iter().map(|r| r.company.clone());
    for company in listed.chain(found) {
        if !company.is_empty() && known.insert(company.clone()) {
            companies.push(company);
        }
    }

    let mut years: BTreeSet<i32> = BTreeSet::new();
    for y in &metadata.years {
        match y.as_year() {
            Some(y) => {
                years.insert(y);
            }
            None => warn!(year = ?y, "ignoring unparseable metadata year"),
        }
    }
    years.extend(records.iter().map(|r| r.year));

    Dataset {
        companies,
        years: years.into_iter().collect(),
        units: metadata.units,
        records,
    }
}
