//! Composite ESG scoring for a single-year comparison set.
//!
//! Lower-is-better indicators are scored relative to the worst performer in
//! the set: `100 - value / max * 50`, so the worst scores 50 and a zero
//! scores 100. With a single row every such indicator therefore scores 50.
//! Higher-is-better percentages are used as-is; the renewable ratio is
//! weighted by 1.5 and left unclamped.

use crate::types::{Category, CategoryScore, Indicator, MetricRecord, ScoredRow};
use crate::util::{average, max_value};
use serde::Serialize;
use std::cmp::Ordering;

pub const SAFETY_WEIGHT: f64 = 0.4;
pub const ENVIRONMENTAL_WEIGHT: f64 = 0.6;
pub const RENEWABLE_RATIO_WEIGHT: f64 = 1.5;
const RELATIVE_PENALTY: f64 = 50.0;

/// Scored rows, best first, ranks starting at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedTable {
    pub rows: Vec<ScoredRow>,
}

impl RankedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn leader(&self) -> Option<&ScoredRow> {
        self.rows.first()
    }

    pub fn get(&self, company: &str) -> Option<&ScoredRow> {
        self.rows.iter().find(|r| r.record.company == company)
    }

    /// Mean overall score across the comparison set.
    pub fn industry_average(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let overall: Vec<f64> = self.rows.iter().map(|r| r.overall_score).collect();
        Some(average(&overall))
    }

    pub fn above_average(&self, row: &ScoredRow) -> bool {
        self.industry_average()
            .map(|avg| row.overall_score > avg)
            .unwrap_or(false)
    }

    /// Safety and environmental score per company, in rank order.
    pub fn category_breakdown(&self) -> Vec<CategoryScore> {
        self.rows
            .iter()
            .flat_map(|r| {
                [
                    CategoryScore {
                        company: r.record.company.clone(),
                        category: Category::Safety,
                        score: r.safety_score,
                    },
                    CategoryScore {
                        company: r.record.company.clone(),
                        category: Category::Environmental,
                        score: r.environmental_score,
                    },
                ]
            })
            .collect()
    }
}

/// Indicators that feed the score, in sub-score order. The renewable
/// energy amount is display-only.
const SCORED: [Indicator; 8] = [
    Indicator::AccidentRate,
    Indicator::Fatalities,
    Indicator::SafetyAuditCompliance,
    Indicator::CarbonEmissions,
    Indicator::EnergyConsumption,
    Indicator::RenewableEnergyRatio,
    Indicator::ConstructionWaste,
    Indicator::RecyclingRate,
];

/// Column maxima, aligned with [`SCORED`].
fn column_maxima(table: &[MetricRecord]) -> [f64; 8] {
    SCORED.map(|i| max_value(table.iter().filter_map(|r| r.value(i))).unwrap_or(0.0))
}

/// Score of a lower-is-better value against the set's maximum. A zero
/// maximum is replaced by 1 so an all-zero column scores 100.
pub fn relative_score(value: f64, max: f64) -> f64 {
    let denom = if max == 0.0 { 1.0 } else { max };
    100.0 - (value / denom) * RELATIVE_PENALTY
}

fn sub_score(indicator: Indicator, value: f64, max: f64) -> f64 {
    if indicator.lower_is_better() {
        relative_score(value, max)
    } else if indicator == Indicator::RenewableEnergyRatio {
        value * RENEWABLE_RATIO_WEIGHT
    } else {
        value
    }
}

fn category_mean(scores: &[f64; 8], category: Category) -> f64 {
    let members: Vec<f64> = SCORED
        .iter()
        .zip(scores)
        .filter(|(i, _)| i.category() == category)
        .map(|(_, s)| *s)
        .collect();
    average(&members)
}

fn score_row(r: &MetricRecord, maxima: &[f64; 8]) -> ScoredRow {
    let mut scores = [0.0; 8];
    for (k, indicator) in SCORED.iter().enumerate() {
        // missing fields score as 0
        let value = r.value(*indicator).unwrap_or(0.0);
        scores[k] = sub_score(*indicator, value, maxima[k]);
    }

    let safety_score = category_mean(&scores, Category::Safety);
    let environmental_score = category_mean(&scores, Category::Environmental);
    let overall_score = safety_score * SAFETY_WEIGHT + environmental_score * ENVIRONMENTAL_WEIGHT;

    let [
        accident_rate_score,
        fatality_score,
        safety_audit_score,
        carbon_score,
        energy_score,
        renewable_score,
        waste_score,
        recycling_score,
    ] = scores;

    ScoredRow {
        rank: 0,
        record: r.clone(),
        accident_rate_score,
        fatality_score,
        safety_audit_score,
        carbon_score,
        energy_score,
        renewable_score,
        waste_score,
        recycling_score,
        safety_score,
        environmental_score,
        overall_score,
    }
}

/// Score and rank a single-year table. Ties keep their input order.
pub fn score(table: &[MetricRecord]) -> RankedTable {
    if table.is_empty() {
        return RankedTable::default();
    }
    let maxima = column_maxima(table);
    let mut rows: Vec<ScoredRow> = table.iter().map(|r| score_row(r, &maxima)).collect();

    rows.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(Ordering::Equal)
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    RankedTable { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: &str) -> MetricRecord {
        MetricRecord {
            company: company.to_string(),
            year: 2025,
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

    #[test]
    fn test_relative_score() {
        assert_eq!(relative_score(2.0, 4.0), 75.0);
        assert_eq!(relative_score(4.0, 4.0), 50.0);
        assert_eq!(relative_score(0.0, 0.0), 100.0);
    }

    #[test]
    fn test_accident_rate_is_scale_relative() {
        let mut a = record("A");
        a.accident_rate = 2.0;
        let mut b = record("B");
        b.accident_rate = 4.0;
        let ranked = score(&[a, b]);
        assert_eq!(ranked.get("A").unwrap().accident_rate_score, 75.0);
        assert_eq!(ranked.get("B").unwrap().accident_rate_score, 50.0);
    }

    #[test]
    fn test_all_zero_fatalities_score_100() {
        let ranked = score(&[record("A"), record("B"), record("C")]);
        assert!(ranked.rows.iter().all(|r| r.fatality_score == 100.0));
    }

    #[test]
    fn test_renewable_ratio_is_overweighted_and_unclamped() {
        let mut a = record("A");
        a.renewable_energy_ratio = 60.0;
        let mut b = record("B");
        b.renewable_energy_ratio = 80.0;
        let ranked = score(&[a, b]);
        assert_eq!(ranked.get("A").unwrap().renewable_score, 90.0);
        assert_eq!(ranked.get("B").unwrap().renewable_score, 120.0);
    }

    #[test]
    fn test_single_row_scores_fifty_on_relative_indicators() {
        let ranked = score(&[record("Solo")]);
        let row = ranked.leader().unwrap();
        assert_eq!(row.rank, 1);
        assert_eq!(row.accident_rate_score, 50.0);
        assert_eq!(row.carbon_score, 50.0);
        assert_eq!(row.energy_score, 50.0);
        assert_eq!(row.waste_score, 50.0);
        // zero fatalities hit the zero-max guard instead
        assert_eq!(row.fatality_score, 100.0);
    }

    #[test]
    fn test_category_and_overall_weights() {
        let ranked = score(&[record("Solo")]);
        let row = ranked.leader().unwrap();
        let safety = (50.0 + 100.0 + 90.0) / 3.0;
        let environmental = (50.0 + 50.0 + 30.0 + 50.0 + 80.0) / 5.0;
        assert!((row.safety_score - safety).abs() < 1e-9);
        assert!((row.environmental_score - environmental).abs() < 1e-9);
        assert!((row.overall_score - (safety * 0.4 + environmental * 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_categories_follow_indicator_catalog() {
        let safety = SCORED.iter().filter(|i| i.category() == Category::Safety).count();
        let environmental = SCORED.len() - safety;
        assert_eq!((safety, environmental), (3, 5));
        assert!(!SCORED.contains(&Indicator::RenewableEnergyAmount));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = score(&[record("First"), record("Second"), record("Third")]);
        let names: Vec<_> = ranked.rows.iter().map(|r| r.record.company.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        let ranks: Vec<_> = ranked.rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_ranking_descends_by_overall() {
        let mut weak = record("Weak");
        weak.recycling_rate = 10.0;
        let strong = record("Strong");
        let ranked = score(&[weak, strong]);
        assert_eq!(ranked.leader().unwrap().record.company, "Strong");
        assert!(ranked.rows[0].overall_score > ranked.rows[1].overall_score);
    }

    #[test]
    fn test_renewable_amount_does_not_affect_scores() {
        let mut with_amount = record("A");
        with_amount.renewable_energy_amount = Some(500.0);
        let a = score(&[with_amount, record("B")]);
        let b = score(&[record("A"), record("B")]);
        assert_eq!(a.rows[0].overall_score, b.rows[0].overall_score);
    }

    #[test]
    fn test_empty_table() {
        let ranked = score(&[]);
        assert!(ranked.is_empty());
        assert_eq!(ranked.industry_average(), None);
        assert!(ranked.category_breakdown().is_empty());
    }

    #[test]
    fn test_industry_average_and_breakdown() {
        let mut weak = record("Weak");
        weak.recycling_rate = 10.0;
        let ranked = score(&[record("Strong"), weak]);
        let avg = ranked.industry_average().unwrap();
        let expected = (ranked.rows[0].overall_score + ranked.rows[1].overall_score) / 2.0;
        assert!((avg - expected).abs() < 1e-9);
        assert!(ranked.above_average(&ranked.rows[0]));
        assert!(!ranked.above_average(&ranked.rows[1]));

        let breakdown = ranked.category_breakdown();
        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[0].company, "Strong");
        assert_eq!(breakdown[0].category, Category::Safety);
        assert_eq!(breakdown[1].category, Category::Environmental);
    }
}
