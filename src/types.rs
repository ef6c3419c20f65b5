use crate::util::{format_number, parse_f64_safe, parse_i32_safe};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tabled::Tabled;

/// A number as it appears in the source file. Older exports wrote some
/// indicators (and most years) as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// `None` for anything that is neither a JSON number nor a string.
    pub fn from_value(value: &Value) -> Option<RawNumber> {
        match value {
            Value::Number(n) => n.as_f64().map(RawNumber::Number),
            Value::String(s) => Some(RawNumber::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) if n.is_finite() => Some(*n),
            RawNumber::Number(_) => None,
            RawNumber::Text(s) => parse_f64_safe(Some(s)).filter(|n| n.is_finite()),
        }
    }

    /// Years are always compared as integers, whatever their JSON type.
    pub fn as_year(&self) -> Option<i32> {
        match self {
            RawNumber::Number(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => {
                Some(*n as i32)
            }
            RawNumber::Number(_) => None,
            RawNumber::Text(s) => parse_i32_safe(Some(s)),
        }
    }
}

/// One company-year record exactly as found in the source, before defaults
/// are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub company_name: Option<String>,
    pub year: Option<RawNumber>,
    pub accident_rate: Option<RawNumber>,
    pub fatalities: Option<RawNumber>,
    pub safety_audit_compliance: Option<RawNumber>,
    pub carbon_emissions: Option<RawNumber>,
    pub energy_consumption: Option<RawNumber>,
    pub renewable_energy_ratio: Option<RawNumber>,
    pub renewable_energy_amount: Option<RawNumber>,
    pub construction_waste: Option<RawNumber>,
    pub recycling_rate: Option<RawNumber>,
}

impl RawRecord {
    /// Read a record field by field. The canonical key wins over its legacy
    /// name, a value of the wrong type reads as absent, and unknown keys are
    /// ignored, so one bad field never costs the whole record.
    pub fn from_map(map: &Map<String, Value>) -> RawRecord {
        let number = |i: Indicator| {
            i.keys()
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(RawNumber::from_value)
        };
        let company_name = ["company_name", "company"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|v| v.as_str().map(String::from));

        RawRecord {
            company_name,
            year: map.get("year").and_then(RawNumber::from_value),
            accident_rate: number(Indicator::AccidentRate),
            fatalities: number(Indicator::Fatalities),
            safety_audit_compliance: number(Indicator::SafetyAuditCompliance),
            carbon_emissions: number(Indicator::CarbonEmissions),
            energy_consumption: number(Indicator::EnergyConsumption),
            renewable_energy_ratio: number(Indicator::RenewableEnergyRatio),
            renewable_energy_amount: number(Indicator::RenewableEnergyAmount),
            construction_waste: number(Indicator::ConstructionWaste),
            recycling_rate: number(Indicator::RecyclingRate),
        }
    }
}

/// One company's measurements for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub company: String,
    pub year: i32,
    pub accident_rate: f64,
    pub fatalities: f64,
    pub safety_audit_compliance: f64,
    pub carbon_emissions: f64,
    pub energy_consumption: f64,
    pub renewable_energy_ratio: f64,
    /// Display-only; `None` means the company did not report it that year.
    pub renewable_energy_amount: Option<f64>,
    pub construction_waste: f64,
    pub recycling_rate: f64,
}

impl MetricRecord {
    pub fn value(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::AccidentRate => Some(self.accident_rate),
            Indicator::Fatalities => Some(self.fatalities),
            Indicator::SafetyAuditCompliance => Some(self.safety_audit_compliance),
            Indicator::CarbonEmissions => Some(self.carbon_emissions),
            Indicator::EnergyConsumption => Some(self.energy_consumption),
            Indicator::RenewableEnergyRatio => Some(self.renewable_energy_ratio),
            Indicator::RenewableEnergyAmount => self.renewable_energy_amount,
            Indicator::ConstructionWaste => Some(self.construction_waste),
            Indicator::RecyclingRate => Some(self.recycling_rate),
        }
    }
}

/// An ordered, fully materialized collection of rows.
pub type Table = Vec<MetricRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Safety,
    Environmental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    AccidentRate,
    Fatalities,
    SafetyAuditCompliance,
    CarbonEmissions,
    EnergyConsumption,
    RenewableEnergyRatio,
    RenewableEnergyAmount,
    ConstructionWaste,
    RecyclingRate,
}

/// Canonical and legacy keys, both resolving to the same indicator.
static INDICATORS_BY_KEY: Lazy<HashMap<&'static str, Indicator>> = Lazy::new(|| {
    Indicator::ALL
        .iter()
        .flat_map(|i| i.keys().iter().map(move |k| (*k, *i)))
        .collect()
});

impl Indicator {
    pub const ALL: [Indicator; 9] = [
        Indicator::AccidentRate,
        Indicator::Fatalities,
        Indicator::SafetyAuditCompliance,
        Indicator::CarbonEmissions,
        Indicator::EnergyConsumption,
        Indicator::RenewableEnergyRatio,
        Indicator::RenewableEnergyAmount,
        Indicator::ConstructionWaste,
        Indicator::RecyclingRate,
    ];

    pub fn from_key(key: &str) -> Option<Indicator> {
        INDICATORS_BY_KEY.get(key).copied()
    }

    /// Canonical key first, then the name older exports used, if any.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Indicator::AccidentRate => &["accident_rate"],
            Indicator::Fatalities => &["fatalities", "fatality_rate"],
            Indicator::SafetyAuditCompliance => {
                &["safety_audit_compliance", "safety_inspection_compliance_rate"]
            }
            Indicator::CarbonEmissions => &["carbon_emissions"],
            Indicator::EnergyConsumption => &["energy_consumption"],
            Indicator::RenewableEnergyRatio => &["renewable_energy_ratio"],
            Indicator::RenewableEnergyAmount => &["renewable_energy_amount"],
            Indicator::ConstructionWaste => &["construction_waste"],
            Indicator::RecyclingRate => &["recycling_rate"],
        }
    }

    pub fn key(&self) -> &'static str {
        self.keys()[0]
    }

    /// Column header used in tables and the CSV export.
    pub fn display_name(&self) -> &'static str {
        match self {
            Indicator::AccidentRate => "Accident Rate (‰)",
            Indicator::Fatalities => "Fatalities",
            Indicator::SafetyAuditCompliance => "Safety Audit Compliance (%)",
            Indicator::CarbonEmissions => "Carbon Emissions (tCO₂e)",
            Indicator::EnergyConsumption => "Energy Consumption (kWh/㎡)",
            Indicator::RenewableEnergyRatio => "Renewable Energy Ratio (%)",
            Indicator::RenewableEnergyAmount => "Renewable Energy Amount (GWh)",
            Indicator::ConstructionWaste => "Construction Waste (ton)",
            Indicator::RecyclingRate => "Recycling Rate (%)",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Indicator::AccidentRate => "‰",
            Indicator::Fatalities => "persons",
            Indicator::SafetyAuditCompliance
            | Indicator::RenewableEnergyRatio
            | Indicator::RecyclingRate => "%",
            Indicator::CarbonEmissions => "tCO₂e",
            Indicator::EnergyConsumption => "kWh/㎡",
            Indicator::RenewableEnergyAmount => "GWh",
            Indicator::ConstructionWaste => "ton",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Indicator::AccidentRate | Indicator::Fatalities | Indicator::SafetyAuditCompliance => {
                Category::Safety
            }
            _ => Category::Environmental,
        }
    }

    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            Indicator::AccidentRate
                | Indicator::Fatalities
                | Indicator::CarbonEmissions
                | Indicator::EnergyConsumption
                | Indicator::ConstructionWaste
        )
    }
}

/// The full collection of records plus metadata. Never mutated once built;
/// the store replaces it as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Canonical membership and display order.
    pub companies: Vec<String>,
    /// Ascending, deduplicated.
    pub years: Vec<i32>,
    /// Units declared by the source's metadata, keyed by indicator key.
    pub units: BTreeMap<String, String>,
    pub records: Vec<MetricRecord>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric maximum of the year list.
    pub fn latest_year(&self) -> Option<i32> {
        self.years.iter().max().copied()
    }
}

/// A [`MetricRecord`] with its derived scores. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    pub rank: usize,
    #[serde(flatten)]
    pub record: MetricRecord,
    pub accident_rate_score: f64,
    pub fatality_score: f64,
    pub safety_audit_score: f64,
    pub carbon_score: f64,
    pub energy_score: f64,
    pub renewable_score: f64,
    pub waste_score: f64,
    pub recycling_score: f64,
    pub safety_score: f64,
    pub environmental_score: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub company: String,
    pub category: Category,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub company_count: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub indicator_count: usize,
}

/// Row layout of the CSV export: raw values under display headers.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Accident Rate (‰)")]
    pub accident_rate: f64,
    #[serde(rename = "Fatalities")]
    pub fatalities: f64,
    #[serde(rename = "Safety Audit Compliance (%)")]
    pub safety_audit_compliance: f64,
    #[serde(rename = "Carbon Emissions (tCO₂e)")]
    pub carbon_emissions: f64,
    #[serde(rename = "Energy Consumption (kWh/㎡)")]
    pub energy_consumption: f64,
    #[serde(rename = "Renewable Energy Ratio (%)")]
    pub renewable_energy_ratio: f64,
    #[serde(rename = "Renewable Energy Amount (GWh)")]
    pub renewable_energy_amount: Option<f64>,
    #[serde(rename = "Construction Waste (ton)")]
    pub construction_waste: f64,
    #[serde(rename = "Recycling Rate (%)")]
    pub recycling_rate: f64,
}

impl From<&MetricRecord> for ExportRow {
    fn from(r: &MetricRecord) -> Self {
        ExportRow {
            company: r.company.clone(),
            year: r.year,
            accident_rate: r.accident_rate,
            fatalities: r.fatalities,
            safety_audit_compliance: r.safety_audit_compliance,
            carbon_emissions: r.carbon_emissions,
            energy_consumption: r.energy_consumption,
            renewable_energy_ratio: r.renewable_energy_ratio,
            renewable_energy_amount: r.renewable_energy_amount,
            construction_waste: r.construction_waste,
            recycling_rate: r.recycling_rate,
        }
    }
}

/// Console rendering of a record, numbers pre-formatted.
#[derive(Debug, Clone, Tabled)]
pub struct MetricDisplayRow {
    #[tabled(rename = "Company")]
    pub company: String,
    #[tabled(rename = "Accident Rate (‰)")]
    pub accident_rate: String,
    #[tabled(rename = "Fatalities")]
    pub fatalities: String,
    #[tabled(rename = "Safety Audit Compliance (%)")]
    pub safety_audit_compliance: String,
    #[tabled(rename = "Carbon Emissions (tCO₂e)")]
    pub carbon_emissions: String,
    #[tabled(rename = "Energy Consumption (kWh/㎡)")]
    pub energy_consumption: String,
    #[tabled(rename = "Renewable Energy Ratio (%)")]
    pub renewable_energy_ratio: String,
    #[tabled(rename = "Renewable Energy Amount (GWh)")]
    pub renewable_energy_amount: String,
    #[tabled(rename = "Construction Waste (ton)")]
    pub construction_waste: String,
    #[tabled(rename = "Recycling Rate (%)")]
    pub recycling_rate: String,
}

impl From<&MetricRecord> for MetricDisplayRow {
    fn from(r: &MetricRecord) -> Self {
        MetricDisplayRow {
            company: r.company.clone(),
            accident_rate: format!("{:.1}‰", r.accident_rate),
            fatalities: format!("{:.1}", r.fatalities),
            safety_audit_compliance: format!("{:.1}%", r.safety_audit_compliance),
            carbon_emissions: format_number(r.carbon_emissions, 0),
            energy_consumption: format!("{:.1}", r.energy_consumption),
            renewable_energy_ratio: format!("{:.1}%", r.renewable_energy_ratio),
            renewable_energy_amount: r
                .renewable_energy_amount
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "N/A".to_string()),
            construction_waste: format_number(r.construction_waste, 0),
            recycling_rate: format!("{:.1}%", r.recycling_rate),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ScoreDisplayRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "ESG Overall Score")]
    #[tabled(rename = "ESG Overall Score")]
    pub overall_score: String,
    #[serde(rename = "Safety Score")]
    #[tabled(rename = "Safety Score")]
    pub safety_score: String,
    #[serde(rename = "Environmental Score")]
    #[tabled(rename = "Environmental Score")]
    pub environmental_score: String,
}

impl From<&ScoredRow> for ScoreDisplayRow {
    fn from(r: &ScoredRow) -> Self {
        ScoreDisplayRow {
            rank: r.rank,
            company: r.record.company.clone(),
            overall_score: format_number(r.overall_score, 1),
            safety_score: format_number(r.safety_score, 1),
            environmental_score: format_number(r.environmental_score, 1),
        }
    }
}
