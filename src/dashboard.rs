//! Dashboard view over the current snapshot.
//!
//! Combines the dataset source with the aggregation and filter functions
//! into the payloads the presentation layer renders directly:
//! - Headline KPIs
//! - Status breakdowns for charts
//! - Harvest, recall and quality panels
//!
//! # Usage
//!
//! ```ignore
//! let dashboard = Dashboard::new(DatasetSource::fixtures(), DashboardConfig::default());
//! let overview = dashboard.overview().await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activity::{ActivityItem, recent_activity};
use crate::aggregation::{
    HarvestStats, MonthlyCompliance, RecallSummary, SpeciesHarvest, compliance_trend, compute_kpis,
    count_by_status, harvest_by_species, harvest_stats, quality_pass_rate, recall_summary,
};
use crate::dataset::{BatchTrace, DatasetSource, Snapshot};
use crate::error::DataError;
use crate::filter::EventQuery;
use crate::model::{
    BatchStatus, CollectionEvent, Compliance, ComplianceStatus, KpiData, RecallEvent, StepStatus,
};

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Default number of items in the activity feed.
    pub activity_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { activity_limit: 10 }
    }
}

/// Status breakdowns, zero-filled over every known variant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub compliance: BTreeMap<ComplianceStatus, usize>,
    pub batches: BTreeMap<BatchStatus, usize>,
    pub processing: BTreeMap<StepStatus, usize>,
}

/// Everything the overview page renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// When this response was generated.
    pub timestamp: DateTime<Utc>,

    pub kpis: KpiData,

    pub status: StatusBreakdown,

    pub harvest: HarvestStats,

    /// Harvest totals per species, largest first.
    pub species: Vec<SpeciesHarvest>,

    /// Compliance and sustainability per month, oldest first.
    pub trend: Vec<MonthlyCompliance>,

    pub recalls: RecallSummary,

    pub quality_pass_rate: f64,

    /// Records rejected while loading the snapshot.
    pub skipped_records: usize,
}

/// A collection event as served to the harvest monitor, with its
/// compliance folded into one tagged value.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: CollectionEvent,
    pub compliance: Compliance,
}

impl From<&CollectionEvent> for EventView {
    fn from(event: &CollectionEvent) -> Self {
        Self {
            event: event.clone(),
            compliance: event.compliance(),
        }
    }
}

/// Dashboard over a dataset source.
#[derive(Clone)]
pub struct Dashboard {
    config: Arc<DashboardConfig>,
    source: DatasetSource,
}

impl Dashboard {
    /// Create a new dashboard with the given source and configuration.
    pub fn new(source: DatasetSource, config: DashboardConfig) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    pub fn activity_limit(&self) -> usize {
        self.config.activity_limit
    }

    /// Load a fresh snapshot from the source.
    pub async fn snapshot(&self) -> Result<Snapshot, DataError> {
        self.source.load().await
    }

    pub async fn kpis(&self) -> Result<KpiData, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(compute_kpis(&snapshot.dataset, snapshot.recent_scans))
    }

    /// Collection events matching `query`, in dataset order.
    pub async fn events(&self, query: &EventQuery) -> Result<Vec<EventView>, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(query
            .apply(&snapshot.dataset.collection_events)
            .into_iter()
            .map(EventView::from)
            .collect())
    }

    /// Harvest figures over the events matching `query`.
    pub async fn harvest_stats(&self, query: &EventQuery) -> Result<HarvestStats, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(harvest_stats(
            query.apply(&snapshot.dataset.collection_events),
        ))
    }

    pub async fn overview(&self) -> Result<DashboardResponse, DataError> {
        let snapshot = self.snapshot().await?;
        let dataset = &snapshot.dataset;

        Ok(DashboardResponse {
            timestamp: Utc::now(),
            kpis: compute_kpis(dataset, snapshot.recent_scans),
            status: StatusBreakdown {
                compliance: count_by_status(&dataset.collection_events, |e| e.compliance_status),
                batches: count_by_status(&dataset.batches, |b| b.status),
                processing: count_by_status(&dataset.processing_steps, |s| s.status),
            },
            harvest: harvest_stats(&dataset.collection_events),
            species: harvest_by_species(&dataset.collection_events),
            trend: compliance_trend(&dataset.collection_events),
            recalls: recall_summary(&dataset.recalls),
            quality_pass_rate: quality_pass_rate(&dataset.quality_tests),
            skipped_records: dataset.skipped_count(),
        })
    }

    /// Trace a batch by id. `Ok(None)` when no such batch exists.
    pub async fn batch_trace(&self, batch_id: &str) -> Result<Option<BatchTrace>, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.dataset.batch_trace(batch_id))
    }

    /// Trace a batch by the QR code printed on its packaging.
    pub async fn batch_trace_by_qr(&self, qr_code: &str) -> Result<Option<BatchTrace>, DataError> {
        let snapshot = self.snapshot().await?;
        let dataset = &snapshot.dataset;
        Ok(dataset
            .find_by_qr(qr_code)
            .and_then(|batch| dataset.batch_trace(&batch.id)))
    }

    pub async fn recalls(&self) -> Result<Vec<RecallEvent>, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.dataset.recalls.clone())
    }

    pub async fn activity(&self, limit: usize) -> Result<Vec<ActivityItem>, DataError> {
        let snapshot = self.snapshot().await?;
        Ok(recent_activity(&snapshot.dataset, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::SnapshotClient;
    use crate::filter::StatusQuery;
    use crate::model::{StatusField, ViolationReason};

    fn fixture_dashboard() -> Dashboard {
        Dashboard::new(DatasetSource::fixtures(), DashboardConfig::default())
    }

    #[tokio::test]
    async fn test_overview_from_fixtures() {
        let overview = fixture_dashboard().overview().await.unwrap();

        assert_eq!(overview.kpis.compliance_rate, 50.0);
        assert_eq!(overview.kpis.recent_scans, 15_420);
        assert_eq!(overview.status.compliance[&ComplianceStatus::Pending], 0);
        assert_eq!(overview.status.batches.len(), BatchStatus::ALL.len());
        assert_eq!(overview.harvest.total_events, 2);
        assert_eq!(overview.species.len(), 2);
        assert_eq!(overview.species[0].species, "Ashwagandha");
        assert_eq!(overview.trend.len(), 1);
        assert_eq!(overview.trend[0].month, "2024-09");
        assert_eq!(overview.recalls.active, 1);
        assert_eq!(overview.quality_pass_rate, 100.0);
        assert_eq!(overview.skipped_records, 0);
    }

    #[tokio::test]
    async fn test_events_filtered() {
        let dashboard = fixture_dashboard();
        let query = EventQuery {
            species: "all".to_string(),
            status: StatusQuery::Only(ComplianceStatus::Violation),
        };

        let events = dashboard.events(&query).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.id, "ce-002");
        assert_eq!(
            events[0].compliance,
            Compliance::Violation {
                reasons: vec![ViolationReason::GeoFence]
            }
        );

        let stats = dashboard.harvest_stats(&query).await.unwrap();
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.total_quantity_kg, 180.0);
    }

    #[tokio::test]
    async fn test_batch_trace_by_qr() {
        let dashboard = fixture_dashboard();

        let trace = dashboard
            .batch_trace_by_qr("QR-TUR-002-2024")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trace.batch.id, "batch-002");

        assert!(dashboard.batch_trace("batch-999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_source_propagates() {
        let dashboard = Dashboard::new(
            DatasetSource::Remote(SnapshotClient::with_base_url("http://127.0.0.1:9")),
            DashboardConfig::default(),
        );

        assert!(matches!(
            dashboard.kpis().await,
            Err(DataError::Unavailable(_))
        ));
    }
}
