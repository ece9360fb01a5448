//! Aggregation logic for computing dashboard KPIs and grouped counts.
//!
//! Every function here is pure and total: empty inputs produce zeros, never
//! NaN or an error. Each makes a single pass over its input.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::model::{
    CollectionEvent, ComplianceStatus, KpiData, QualityTest, RecallEvent, RecallSeverity,
    StatusField,
};

/// `100 * part / total`, or 0 when there is nothing to divide by.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Compute the dashboard headline figures.
///
/// # Arguments
///
/// * `dataset` - The snapshot to summarize
/// * `recent_scans` - Scan counter supplied by the data source; it is not
///   derivable from the records themselves
pub fn compute_kpis(dataset: &Dataset, recent_scans: u64) -> KpiData {
    let total_events = dataset.collection_events.len();
    let mut compliant = 0;
    let mut seasonal_ok = 0;
    let mut score_sum = 0.0;

    for event in &dataset.collection_events {
        if event.compliance_status == ComplianceStatus::Compliant {
            compliant += 1;
        }
        if !event.seasonal_violation {
            seasonal_ok += 1;
        }
        score_sum += event.sustainability_score;
    }

    let fair_trade = dataset
        .batches
        .iter()
        .filter(|b| b.fair_trade_verified)
        .count();

    KpiData {
        compliance_rate: percentage(compliant, total_events),
        seasonal_compliance_rate: percentage(seasonal_ok, total_events),
        fair_trade_percentage: percentage(fair_trade, dataset.batches.len()),
        sustainability_score: mean(score_sum, total_events),
        active_recalls: dataset.recalls.iter().filter(|r| r.is_active()).count(),
        total_batches: dataset.batches.len(),
        recent_scans,
    }
}

/// Count items per value of an enum field.
///
/// Every known variant is present in the result, with zero when no item
/// carries it, so chart series keep a stable shape. Keys iterate in variant
/// declaration order.
pub fn count_by_status<'a, T, S, F>(
    items: impl IntoIterator<Item = &'a T>,
    field: F,
) -> BTreeMap<S, usize>
where
    T: 'a,
    S: StatusField,
    F: Fn(&T) -> S,
{
    let mut counts: BTreeMap<S, usize> = S::ALL.iter().map(|s| (*s, 0)).collect();
    for item in items {
        *counts.entry(field(item)).or_insert(0) += 1;
    }
    counts
}

/// Figures for the harvest monitor panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestStats {
    pub total_events: usize,
    pub compliant_count: usize,
    pub violation_count: usize,
    pub pending_count: usize,
    pub total_quantity_kg: f64,
    pub average_sustainability: f64,
}

pub fn harvest_stats<'a>(events: impl IntoIterator<Item = &'a CollectionEvent>) -> HarvestStats {
    let mut stats = HarvestStats {
        total_events: 0,
        compliant_count: 0,
        violation_count: 0,
        pending_count: 0,
        total_quantity_kg: 0.0,
        average_sustainability: 0.0,
    };
    let mut score_sum = 0.0;

    for event in events {
        stats.total_events += 1;
        match event.compliance_status {
            ComplianceStatus::Compliant => stats.compliant_count += 1,
            ComplianceStatus::Violation => stats.violation_count += 1,
            ComplianceStatus::Pending => stats.pending_count += 1,
        }
        stats.total_quantity_kg += event.quantity_kg();
        score_sum += event.sustainability_score;
    }

    stats.average_sustainability = mean(score_sum, stats.total_events);
    stats
}

/// Harvested quantity for one species.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesHarvest {
    pub species: String,
    pub quantity_kg: f64,
    pub event_count: usize,
}

/// Total harvest per species common name, largest first.
///
/// Species with equal totals keep the order in which they first appear.
pub fn harvest_by_species<'a>(
    events: impl IntoIterator<Item = &'a CollectionEvent>,
) -> Vec<SpeciesHarvest> {
    let mut totals: Vec<SpeciesHarvest> = Vec::new();

    for event in events {
        let name = event.common_name();
        match totals.iter_mut().find(|t| t.species == name) {
            Some(entry) => {
                entry.quantity_kg += event.quantity_kg();
                entry.event_count += 1;
            }
            None => totals.push(SpeciesHarvest {
                species: name.to_string(),
                quantity_kg: event.quantity_kg(),
                event_count: 1,
            }),
        }
    }

    // Stable sort keeps first-appearance order for ties
    totals.sort_by(|a, b| b.quantity_kg.total_cmp(&a.quantity_kg));
    totals
}

/// Compliance and sustainability for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCompliance {
    /// `YYYY-MM`, in UTC.
    pub month: String,
    pub event_count: usize,
    pub compliance_rate: f64,
    pub sustainability_score: f64,
}

#[derive(Default)]
struct MonthBucket {
    events: usize,
    compliant: usize,
    score_sum: f64,
}

/// Month-by-month compliance rate and mean sustainability score, oldest
/// month first. Months without events are omitted.
pub fn compliance_trend<'a>(
    events: impl IntoIterator<Item = &'a CollectionEvent>,
) -> Vec<MonthlyCompliance> {
    let mut buckets: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();

    for event in events {
        let key = (event.timestamp.year(), event.timestamp.month());
        let bucket = buckets.entry(key).or_default();
        bucket.events += 1;
        if event.compliance_status == ComplianceStatus::Compliant {
            bucket.compliant += 1;
        }
        bucket.score_sum += event.sustainability_score;
    }

    buckets
        .into_iter()
        .map(|((year, month), bucket)| MonthlyCompliance {
            month: format!("{:04}-{:02}", year, month),
            event_count: bucket.events,
            compliance_rate: percentage(bucket.compliant, bucket.events),
            sustainability_score: mean(bucket.score_sum, bucket.events),
        })
        .collect()
}

/// Recall figures for the risk panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallSummary {
    pub total: usize,
    pub active: usize,
    pub by_severity: BTreeMap<RecallSeverity, usize>,
    pub affected_products: u64,
    pub average_recovery_rate: f64,
}

pub fn recall_summary(recalls: &[RecallEvent]) -> RecallSummary {
    let mut active = 0;
    let mut affected_products = 0u64;
    let mut recovery_sum = 0.0;

    for recall in recalls {
        if recall.is_active() {
            active += 1;
        }
        affected_products += u64::from(recall.affected_products);
        recovery_sum += recall.recovery_rate;
    }

    RecallSummary {
        total: recalls.len(),
        active,
        by_severity: count_by_status(recalls, |r| r.severity),
        affected_products,
        average_recovery_rate: mean(recovery_sum, recalls.len()),
    }
}

/// Percentage of quality tests that passed.
pub fn quality_pass_rate(tests: &[QualityTest]) -> f64 {
    percentage(tests.iter().filter(|t| t.passed).count(), tests.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::model::{BatchStatus, RecallStatus, StepStatus};

    fn fixture_dataset() -> Dataset {
        Dataset::from_raw(fixtures::raw_dataset())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_kpis_from_fixtures() {
        let dataset = fixture_dataset();

        let kpis = compute_kpis(&dataset, 99);

        assert!(approx(kpis.compliance_rate, 50.0));
        assert!(approx(kpis.sustainability_score, 7.35));
        assert!(approx(kpis.seasonal_compliance_rate, 100.0));
        assert!(approx(kpis.fair_trade_percentage, 50.0));
        assert_eq!(kpis.active_recalls, 1);
        assert_eq!(kpis.total_batches, 2);
        assert_eq!(kpis.recent_scans, 99);
    }

    #[test]
    fn test_seasonal_rate_follows_seasonal_flag() {
        let mut dataset = fixture_dataset();
        // Compliant on paper but harvested out of season
        dataset.collection_events[0].seasonal_violation = true;

        let kpis = compute_kpis(&dataset, 0);
        assert!(approx(kpis.seasonal_compliance_rate, 50.0));
        assert!(approx(kpis.compliance_rate, 50.0));

        dataset.collection_events[0].seasonal_violation = false;
        dataset.collection_events[1].compliance_status = ComplianceStatus::Compliant;
        dataset.collection_events[1].seasonal_violation = true;

        let kpis = compute_kpis(&dataset, 0);
        assert!(approx(kpis.compliance_rate, 100.0));
        assert!(approx(kpis.seasonal_compliance_rate, 50.0));
    }

    #[test]
    fn test_kpis_empty_dataset_are_zero() {
        let kpis = compute_kpis(&Dataset::default(), 0);

        assert_eq!(kpis.compliance_rate, 0.0);
        assert_eq!(kpis.seasonal_compliance_rate, 0.0);
        assert_eq!(kpis.fair_trade_percentage, 0.0);
        assert_eq!(kpis.sustainability_score, 0.0);
        assert_eq!(kpis.active_recalls, 0);
        assert_eq!(kpis.total_batches, 0);
    }

    #[test]
    fn test_completed_recalls_not_active() {
        let mut dataset = fixture_dataset();
        let mut done = dataset.recalls[0].clone();
        done.id = "recall-002".to_string();
        done.status = RecallStatus::Completed;
        dataset.recalls.push(done);

        assert_eq!(compute_kpis(&dataset, 0).active_recalls, 1);
    }

    #[test]
    fn test_compliance_rate_stays_in_range() {
        let mut dataset = fixture_dataset();
        for i in 0..7 {
            let mut event = dataset.collection_events[i % 2].clone();
            event.id = format!("ce-extra-{}", i);
            dataset.collection_events.push(event);
        }

        let rate = compute_kpis(&dataset, 0).compliance_rate;
        assert!((0.0..=100.0).contains(&rate));
    }

    #[test]
    fn test_count_by_status_zero_fills() {
        let dataset = fixture_dataset();

        let counts = count_by_status(&dataset.collection_events, |e| e.compliance_status);

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&ComplianceStatus::Compliant], 1);
        assert_eq!(counts[&ComplianceStatus::Violation], 1);
        assert_eq!(counts[&ComplianceStatus::Pending], 0);
        assert_eq!(counts.values().sum::<usize>(), dataset.collection_events.len());
    }

    #[test]
    fn test_count_by_status_key_order() {
        let dataset = fixture_dataset();

        let counts = count_by_status(&dataset.batches, |b| b.status);
        let keys: Vec<BatchStatus> = counts.keys().copied().collect();

        assert_eq!(keys, BatchStatus::ALL.to_vec());
        assert_eq!(counts[&BatchStatus::Testing], 1);
        assert_eq!(counts[&BatchStatus::Collection], 1);

        let steps = count_by_status(&dataset.processing_steps, |s| s.status);
        assert_eq!(steps[&StepStatus::Completed], 1);
        assert_eq!(steps.values().sum::<usize>(), 1);
    }

    #[test]
    fn test_harvest_stats() {
        let dataset = fixture_dataset();

        let stats = harvest_stats(&dataset.collection_events);

        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.compliant_count, 1);
        assert_eq!(stats.violation_count, 1);
        assert_eq!(stats.pending_count, 0);
        assert!(approx(stats.total_quantity_kg, 430.0));
        assert!(approx(stats.average_sustainability, 7.35));
    }

    #[test]
    fn test_harvest_stats_normalizes_tons() {
        let mut dataset = fixture_dataset();
        dataset.collection_events[1].unit = crate::model::QuantityUnit::Tons;
        dataset.collection_events[1].quantity = 0.5;

        let stats = harvest_stats(&dataset.collection_events);

        assert!(approx(stats.total_quantity_kg, 750.0));
    }

    #[test]
    fn test_harvest_by_species_sorted_desc() {
        let mut dataset = fixture_dataset();
        let mut more_turmeric = dataset.collection_events[1].clone();
        more_turmeric.id = "ce-003".to_string();
        more_turmeric.quantity = 100.0;
        dataset.collection_events.push(more_turmeric);

        let totals = harvest_by_species(&dataset.collection_events);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].species, "Turmeric");
        assert!(approx(totals[0].quantity_kg, 280.0));
        assert_eq!(totals[0].event_count, 2);
        assert_eq!(totals[1].species, "Ashwagandha");
    }

    #[test]
    fn test_compliance_trend_by_month() {
        let mut dataset = fixture_dataset();
        let mut august = dataset.collection_events[1].clone();
        august.id = "ce-003".to_string();
        august.timestamp = "2024-08-28T09:00:00Z".parse().unwrap();
        august.compliance_status = ComplianceStatus::Compliant;
        august.sustainability_score = 9.0;
        dataset.collection_events.push(august);

        let trend = compliance_trend(&dataset.collection_events);

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].month, "2024-08");
        assert_eq!(trend[0].event_count, 1);
        assert!(approx(trend[0].compliance_rate, 100.0));
        assert!(approx(trend[0].sustainability_score, 9.0));
        assert_eq!(trend[1].month, "2024-09");
        assert_eq!(trend[1].event_count, 2);
        assert!(approx(trend[1].compliance_rate, 50.0));
        assert!(approx(trend[1].sustainability_score, 7.35));
    }

    #[test]
    fn test_compliance_trend_orders_across_years() {
        let mut dataset = fixture_dataset();
        dataset.collection_events[0].timestamp = "2025-01-03T00:00:00Z".parse().unwrap();

        let months: Vec<String> = compliance_trend(&dataset.collection_events)
            .into_iter()
            .map(|m| m.month)
            .collect();

        assert_eq!(months, ["2024-09", "2025-01"]);
        assert!(compliance_trend(&Vec::<CollectionEvent>::new()).is_empty());
    }

    #[test]
    fn test_recall_summary() {
        let dataset = fixture_dataset();

        let summary = recall_summary(&dataset.recalls);

        assert_eq!(summary.total, 1);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.affected_products, 45);
        assert!(approx(summary.average_recovery_rate, 67.5));
        assert_eq!(summary.by_severity[&RecallSeverity::Medium], 1);
        assert_eq!(summary.by_severity[&RecallSeverity::Critical], 0);
    }

    #[test]
    fn test_quality_pass_rate() {
        let mut dataset = fixture_dataset();
        assert!(approx(quality_pass_rate(&dataset.quality_tests), 100.0));

        let mut failed = dataset.quality_tests[0].clone();
        failed.id = "qt-002".to_string();
        failed.passed = false;
        dataset.quality_tests.push(failed);
        assert!(approx(quality_pass_rate(&dataset.quality_tests), 50.0));

        assert_eq!(quality_pass_rate(&[]), 0.0);
    }
}
