//! Projection of raw source records onto the fixed nine-indicator schema.
//!
//! This is the only place defaults are decided: a missing or unparseable
//! indicator becomes `0.0`, except the renewable energy amount, which stays
//! `None` so that "not reported" is never mistaken for "reported zero".

use crate::types::{MetricRecord, RawNumber, RawRecord};

fn or_zero(v: &Option<RawNumber>) -> f64 {
    v.as_ref().and_then(RawNumber::as_f64).unwrap_or(0.0)
}

/// The (company, year) a raw record belongs to, if it names both.
pub fn identity(raw: &RawRecord) -> Option<(&str, i32)> {
    let company = raw.company_name.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
    let year = raw.year.as_ref().and_then(RawNumber::as_year)?;
    Some((company, year))
}

/// Map a raw record onto a [`MetricRecord`]. Total: a record without a
/// company or year projects to an empty name and year `0`.
pub fn project(raw: &RawRecord) -> MetricRecord {
    let (company, year) = identity(raw)
        .map(|(c, y)| (c.to_string(), y))
        .unwrap_or_else(|| (String::new(), 0));

    MetricRecord {
        company,
        year,
        accident_rate: or_zero(&raw.accident_rate),
        fatalities: or_zero(&raw.fatalities),
        safety_audit_compliance: or_zero(&raw.safety_audit_compliance),
        carbon_emissions: or_zero(&raw.carbon_emissions),
        energy_consumption: or_zero(&raw.energy_consumption),
        renewable_energy_ratio: or_zero(&raw.renewable_energy_ratio),
        renewable_energy_amount: raw.renewable_energy_amount.as_ref().and_then(RawNumber::as_f64),
        construction_waste: or_zero(&raw.construction_waste),
        recycling_rate: or_zero(&raw.recycling_rate),
    }
}
