// Entry point: prints the three dashboard views for the configured dataset.
//
// - Overview: dataset summary and the latest-year table, exported to CSV.
// - Trend: year-over-year rows for the first company.
// - Comparison: ranking of the default comparison set, saved as JSON.
use esg_report::output;
use esg_report::util::{format_int, format_number};
use esg_report::{observability, DashboardConfig, DatasetStore, Queries};
use std::env;
use std::sync::Arc;
use tracing::error;

const CONFIG_ENV: &str = "ESG_REPORT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "esg-report.toml";

fn load_config() -> DashboardConfig {
    let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match DashboardConfig::load_or_default(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid config, using defaults");
            DashboardConfig::default()
        }
    }
}

fn handle_overview(queries: &Queries, config: &DashboardConfig) {
    let overview = queries.overview();
    println!("Data Overview");
    println!("{} Companies", format_int(overview.company_count));
    if let (Some(first), Some(last)) = (overview.first_year, overview.last_year) {
        println!("{} - {}", first, last);
    }
    println!("{} Indicators\n", overview.indicator_count);

    let latest = queries.latest_year_snapshot();
    let Some(year) = latest.first().map(|r| r.year) else {
        println!("Unable to load data.\n");
        return;
    };
    println!("Latest Year Data ({})\n", year);
    output::preview_snapshot(&latest, latest.len());
    match output::write_snapshot_csv(&config.export_dir, &latest) {
        Ok(Some(path)) => println!("(Full table exported to {})\n", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn handle_trend(queries: &Queries) {
    let Some(company) = queries.companies().into_iter().next() else {
        return;
    };
    let trend = queries.company_trend(&company);
    println!("Year-over-Year Trend: {}\n", company);
    output::preview_snapshot(&trend, trend.len());
}

fn handle_comparison(queries: &Queries, config: &DashboardConfig) {
    let selected = queries.default_comparison();
    if selected.is_empty() {
        return;
    }
    let ranked = queries.compare(&selected, None);
    println!("Company Comparison: {}\n", selected.join(", "));
    if ranked.is_empty() {
        println!("Unable to find data for the selected companies.\n");
        return;
    }
    output::preview_ranking(&ranked);
    if let Some(avg) = ranked.industry_average() {
        println!("Industry Average: {}\n", format_number(avg, 1));
    }
    let path = config.export_dir.join("ESG_Ranking.json");
    if let Err(e) = output::write_ranking_json(&path, &ranked) {
        eprintln!("Write error: {}", e);
    }
}

fn main() {
    observability::init_tracing();
    let config = load_config();
    let store = Arc::new(DatasetStore::from_config(&config));
    let queries = Queries::from_config(store, &config);

    handle_overview(&queries, &config);
    handle_trend(&queries);
    handle_comparison(&queries, &config);
}
