use crate::scoring::RankedTable;
use crate::types::{ExportRow, MetricDisplayRow, MetricRecord, ScoreDisplayRow};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// File name the latest-year export is saved under.
pub fn export_file_name(year: i32) -> String {
    format!("ESG_Data_{}.csv", year)
}

/// Write a snapshot table to `dir` as `ESG_Data_{year}.csv`, headers being
/// the indicator display names. Returns `None` for an empty table.
pub fn write_snapshot_csv(dir: &Path, table: &[MetricRecord]) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let Some(first) = table.first() else {
        return Ok(None);
    };
    let path = dir.join(export_file_name(first.year));
    let rows: Vec<ExportRow> = table.iter().map(ExportRow::from).collect();
    write_csv(&path, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "snapshot exported");
    Ok(Some(path))
}

pub fn write_ranking_json(path: &Path, ranked: &RankedTable) -> Result<(), Box<dyn Error>> {
    write_json(path, ranked)
}

pub fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows).with(Style::markdown()).to_string()
}

pub fn preview_snapshot(table: &[MetricRecord], max_rows: usize) {
    let rows: Vec<MetricDisplayRow> = table.iter().take(max_rows).map(MetricDisplayRow::from).collect();
    println!("{}\n", render_table(rows));
}

pub fn preview_ranking(ranked: &RankedTable) {
    let rows: Vec<ScoreDisplayRow> = ranked.rows.iter().map(ScoreDisplayRow::from).collect();
    println!("{}\n", render_table(rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::score;
    use crate::types::Indicator;

    fn record(company: &str, amount: Option<f64>) -> MetricRecord {
        MetricRecord {
            company: company.to_string(),
            year: 2025,
            accident_rate: 1.5,
            fatalities: 0.0,
            safety_audit_compliance: 98.0,
            carbon_emissions: 1000.0,
            energy_consumption: 50.0,
            renewable_energy_ratio: 40.0,
            renewable_energy_amount: amount,
            construction_waste: 200.0,
            recycling_rate: 90.0,
        }
    }

    #[test]
    fn test_snapshot_csv_headers_and_missing_amount() {
        let dir = tempfile::tempdir().unwrap();
        let table = vec![record("Alpha", Some(12.5)), record("Beta", None)];
        let path = write_snapshot_csv(dir.path(), &table).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "ESG_Data_2025.csv");

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Company,Year,Accident Rate (‰),Fatalities,"));
        assert!(header.contains("Renewable Energy Amount (GWh)"));
        assert!(header.ends_with("Recycling Rate (%)"));
        assert_eq!(lines.next().unwrap(), "Alpha,2025,1.5,0.0,98.0,1000.0,50.0,40.0,12.5,200.0,90.0");
        assert_eq!(lines.next().unwrap(), "Beta,2025,1.5,0.0,98.0,1000.0,50.0,40.0,,200.0,90.0");
    }

    #[test]
    fn test_export_headers_match_indicator_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot_csv(dir.path(), &[record("Alpha", None)]).unwrap().unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let expected: Vec<String> = ["Company", "Year"]
            .into_iter()
            .chain(Indicator::ALL.iter().map(|i| i.display_name()))
            .map(String::from)
            .collect();
        assert_eq!(headers, expected);
    }

    #[test]
    fn test_ranking_json_carries_scores_and_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.json");
        let ranked = score(&[record("Alpha", Some(1.0)), record("Beta", None)]);
        write_ranking_json(&path, &ranked).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let rows = value["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rank"], 1);
        assert_eq!(rows[0]["company"], "Alpha");
        assert!(rows[0]["overall_score"].is_f64());
        assert!(rows[1]["renewable_energy_amount"].is_null());
    }

    #[test]
    fn test_empty_snapshot_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_snapshot_csv(dir.path(), &[]).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_render_empty_table() {
        assert_eq!(render_table(Vec::<ScoreDisplayRow>::new()), "(no rows)");
    }
}
