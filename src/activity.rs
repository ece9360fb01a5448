//! Recent-activity feed derived from a snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::Dataset;
use crate::model::{ComplianceStatus, RecallStatus, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Collection,
    Processing,
    Testing,
    Violation,
    Recall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    /// Id of the record this item was derived from.
    pub id: String,
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub status: ActivityStatus,
}

/// Build a newest-first feed of at most `limit` items.
///
/// Items with equal timestamps keep dataset order: collection events,
/// processing steps, quality tests, then recalls.
pub fn recent_activity(dataset: &Dataset, limit: usize) -> Vec<ActivityItem> {
    let mut items = Vec::new();

    for event in &dataset.collection_events {
        let (kind, status, title) = match event.compliance_status {
            ComplianceStatus::Compliant => (
                ActivityKind::Collection,
                ActivityStatus::Success,
                format!("New {} collection", event.common_name()),
            ),
            ComplianceStatus::Pending => (
                ActivityKind::Collection,
                ActivityStatus::Warning,
                format!("{} collection awaiting review", event.common_name()),
            ),
            ComplianceStatus::Violation => (
                ActivityKind::Violation,
                ActivityStatus::Error,
                violation_title(event.geo_fence_violation, event.seasonal_violation),
            ),
        };

        items.push(ActivityItem {
            id: event.id.clone(),
            kind,
            title,
            description: format!(
                "{} harvested {} {} of {}",
                event.farmer_name,
                event.quantity,
                event.unit.as_str(),
                event.common_name()
            ),
            timestamp: event.timestamp,
            status,
        });
    }

    for step in &dataset.processing_steps {
        let (verb, status) = match step.status {
            StepStatus::Completed => ("completed", ActivityStatus::Success),
            StepStatus::InProgress => ("started", ActivityStatus::Info),
            StepStatus::Pending => ("scheduled", ActivityStatus::Info),
            StepStatus::Failed => ("failed", ActivityStatus::Error),
        };

        items.push(ActivityItem {
            id: step.id.clone(),
            kind: ActivityKind::Processing,
            title: format!("{} process {}", step.step_type.label(), verb),
            description: format!("{} on batch {}", step.processor_name, step.batch_id),
            timestamp: step.timestamp,
            status,
        });
    }

    for test in &dataset.quality_tests {
        let batch_label = dataset
            .batch(&test.batch_id)
            .map(|b| b.qr_code.as_str())
            .unwrap_or(test.batch_id.as_str());

        let (outcome, status) = if test.passed {
            ("passed", ActivityStatus::Success)
        } else {
            ("failed", ActivityStatus::Error)
        };

        items.push(ActivityItem {
            id: test.id.clone(),
            kind: ActivityKind::Testing,
            title: "Quality test completed".to_string(),
            description: format!(
                "Batch {} {} {} testing at {}",
                batch_label,
                outcome,
                test.test_type.as_str(),
                test.lab_name
            ),
            timestamp: test.timestamp,
            status,
        });
    }

    for recall in &dataset.recalls {
        let status = if recall.status == RecallStatus::Completed {
            ActivityStatus::Info
        } else {
            ActivityStatus::Error
        };

        items.push(ActivityItem {
            id: recall.id.clone(),
            kind: ActivityKind::Recall,
            title: format!("{} severity recall", recall.severity.label()),
            description: format!(
                "{} ({} batches, {} products)",
                recall.reason,
                recall.batch_ids.len(),
                recall.affected_products
            ),
            timestamp: recall.timestamp,
            status,
        });
    }

    // Stable sort keeps dataset order for equal timestamps
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
    items
}

fn violation_title(geo_fence: bool, seasonal: bool) -> String {
    match (geo_fence, seasonal) {
        (true, true) => "Geo-fence and seasonal violation detected",
        (true, false) => "Geo-fence violation detected",
        (false, true) => "Seasonal violation detected",
        (false, false) => "Compliance violation recorded",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn fixture_dataset() -> Dataset {
        Dataset::from_raw(fixtures::raw_dataset())
    }

    #[test]
    fn test_feed_is_newest_first() {
        let feed = recent_activity(&fixture_dataset(), 10);

        let ids: Vec<&str> = feed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["recall-001", "qt-001", "ce-002", "ps-001", "ce-001"]);
    }

    #[test]
    fn test_feed_item_classification() {
        let feed = recent_activity(&fixture_dataset(), 10);
        let by_id = |id: &str| feed.iter().find(|i| i.id == id).unwrap().clone();

        let harvest = by_id("ce-001");
        assert_eq!(harvest.kind, ActivityKind::Collection);
        assert_eq!(harvest.status, ActivityStatus::Success);
        assert_eq!(harvest.title, "New Ashwagandha collection");
        assert_eq!(harvest.description, "Dr. Rajesh Kumar harvested 250 kg of Ashwagandha");

        let violation = by_id("ce-002");
        assert_eq!(violation.kind, ActivityKind::Violation);
        assert_eq!(violation.status, ActivityStatus::Error);
        assert_eq!(violation.title, "Geo-fence violation detected");

        let test = by_id("qt-001");
        assert_eq!(test.kind, ActivityKind::Testing);
        assert!(test.description.contains("QR-ASH-001-2024 passed contaminants"));

        let drying = by_id("ps-001");
        assert_eq!(drying.title, "Drying process completed");

        let recall = by_id("recall-001");
        assert_eq!(recall.status, ActivityStatus::Error);
        assert_eq!(recall.title, "Medium severity recall");
    }

    #[test]
    fn test_feed_respects_limit() {
        let feed = recent_activity(&fixture_dataset(), 2);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, "recall-001");

        assert!(recent_activity(&Dataset::default(), 5).is_empty());
    }
}
