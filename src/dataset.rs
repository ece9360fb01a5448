//! Dataset snapshots and the sources that produce them.
//!
//! Every source yields a [`RawDataset`] of untyped JSON records. Ingestion
//! types and validates each record independently: a record that fails is
//! skipped and reported, never fatal. Only an unreachable source fails a
//! load, with [`DataError::Unavailable`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::data_sources::SnapshotClient;
use crate::error::DataError;
use crate::fixtures;
use crate::model::{
    Batch, CollectionEvent, ProcessingStep, QualityTest, RecallEvent, RecordKind, User,
};
use crate::storage::Storage;

/// Untyped records as delivered by a source, in source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDataset {
    pub users: Vec<Value>,
    pub collection_events: Vec<Value>,
    pub processing_steps: Vec<Value>,
    pub quality_tests: Vec<Value>,
    pub batches: Vec<Value>,
    pub recalls: Vec<Value>,
    /// Scan counter reported by the source, if it tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_scans: Option<u64>,
}

impl RawDataset {
    /// Records of one kind.
    pub fn records(&self, kind: RecordKind) -> &[Value] {
        match kind {
            RecordKind::User => &self.users,
            RecordKind::CollectionEvent => &self.collection_events,
            RecordKind::ProcessingStep => &self.processing_steps,
            RecordKind::QualityTest => &self.quality_tests,
            RecordKind::Batch => &self.batches,
            RecordKind::Recall => &self.recalls,
        }
    }

    pub fn push(&mut self, kind: RecordKind, record: Value) {
        let target = match kind {
            RecordKind::User => &mut self.users,
            RecordKind::CollectionEvent => &mut self.collection_events,
            RecordKind::ProcessingStep => &mut self.processing_steps,
            RecordKind::QualityTest => &mut self.quality_tests,
            RecordKind::Batch => &mut self.batches,
            RecordKind::Recall => &mut self.recalls,
        };
        target.push(record);
    }
}

/// A record dropped during ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub kind: RecordKind,
    pub id: Option<String>,
    pub reason: String,
}

impl SkippedRecord {
    fn new(kind: RecordKind, id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl From<SkippedRecord> for DataError {
    fn from(skipped: SkippedRecord) -> Self {
        DataError::MalformedRecord {
            kind: skipped.kind,
            id: skipped.id,
            reason: skipped.reason,
        }
    }
}

/// An immutable, validated snapshot of the supply chain.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: HashMap<String, User>,
    pub collection_events: Vec<CollectionEvent>,
    pub processing_steps: Vec<ProcessingStep>,
    pub quality_tests: Vec<QualityTest>,
    pub batches: Vec<Batch>,
    pub recalls: Vec<RecallEvent>,
    /// Records rejected during ingestion.
    pub skipped: Vec<SkippedRecord>,
}

/// A batch with every record that references it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTrace {
    pub batch: Batch,
    pub collection_events: Vec<CollectionEvent>,
    pub processing_steps: Vec<ProcessingStep>,
    pub quality_tests: Vec<QualityTest>,
    pub recalls: Vec<RecallEvent>,
}

impl Dataset {
    /// Type and validate every record in `raw`.
    pub fn from_raw(raw: RawDataset) -> Self {
        let mut skipped = Vec::new();

        let users: Vec<User> = ingest(
            RecordKind::User,
            raw.users,
            |u: &User| &u.id,
            |_: &User| Ok(()),
            &mut skipped,
        );
        let collection_events = ingest(
            RecordKind::CollectionEvent,
            raw.collection_events,
            |e: &CollectionEvent| &e.id,
            CollectionEvent::validate,
            &mut skipped,
        );
        let processing_steps = ingest(
            RecordKind::ProcessingStep,
            raw.processing_steps,
            |s: &ProcessingStep| &s.id,
            |s: &ProcessingStep| s.location.validate(),
            &mut skipped,
        );
        let quality_tests = ingest(
            RecordKind::QualityTest,
            raw.quality_tests,
            |t: &QualityTest| &t.id,
            |_: &QualityTest| Ok(()),
            &mut skipped,
        );
        let batches = ingest(
            RecordKind::Batch,
            raw.batches,
            |b: &Batch| &b.id,
            Batch::validate,
            &mut skipped,
        );
        let recalls = ingest(
            RecordKind::Recall,
            raw.recalls,
            |r: &RecallEvent| &r.id,
            RecallEvent::validate,
            &mut skipped,
        );

        for event in collection_events.iter().filter(|e| !e.has_consistent_flags()) {
            debug!(
                event_id = %event.id,
                status = event.compliance_status.as_str(),
                "Violation flag set on a non-violation collection event"
            );
        }

        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();

        Self {
            users,
            collection_events,
            processing_steps,
            quality_tests,
            batches,
            recalls,
            skipped,
        }
    }

    /// Number of records rejected during ingestion.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn batch(&self, id: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == id)
    }

    pub fn find_by_qr(&self, qr_code: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.qr_code == qr_code)
    }

    /// Assemble a batch with its child records, each in dataset order.
    pub fn batch_trace(&self, batch_id: &str) -> Option<BatchTrace> {
        let batch = self.batch(batch_id)?;

        Some(BatchTrace {
            batch: batch.clone(),
            collection_events: self
                .collection_events
                .iter()
                .filter(|e| e.batch_id == batch_id)
                .cloned()
                .collect(),
            processing_steps: self
                .processing_steps
                .iter()
                .filter(|s| s.batch_id == batch_id)
                .cloned()
                .collect(),
            quality_tests: self
                .quality_tests
                .iter()
                .filter(|t| t.batch_id == batch_id)
                .cloned()
                .collect(),
            recalls: self
                .recalls
                .iter()
                .filter(|r| r.batch_ids.iter().any(|id| id == batch_id))
                .cloned()
                .collect(),
        })
    }
}

/// Deserialize, validate and de-duplicate one kind of record.
fn ingest<T, I, V>(
    kind: RecordKind,
    records: Vec<Value>,
    id_of: I,
    validate: V,
    skipped: &mut Vec<SkippedRecord>,
) -> Vec<T>
where
    T: DeserializeOwned,
    I: Fn(&T) -> &String,
    V: Fn(&T) -> Result<(), String>,
{
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(records.len());

    for value in records {
        match ingest_record(kind, value, &id_of, &validate, &mut seen) {
            Ok(record) => accepted.push(record),
            Err(record) => {
                warn!(error = %DataError::from(record.clone()), "Skipping malformed record");
                skipped.push(record);
            }
        }
    }

    accepted
}

fn ingest_record<T, I, V>(
    kind: RecordKind,
    value: Value,
    id_of: &I,
    validate: &V,
    seen: &mut HashSet<String>,
) -> Result<T, SkippedRecord>
where
    T: DeserializeOwned,
    I: Fn(&T) -> &String,
    V: Fn(&T) -> Result<(), String>,
{
    let raw_id = value.get("id").and_then(Value::as_str).map(str::to_string);

    let record: T = serde_json::from_value(value)
        .map_err(|e| SkippedRecord::new(kind, raw_id.as_deref(), e.to_string()))?;

    let id = id_of(&record);
    validate(&record).map_err(|reason| SkippedRecord::new(kind, Some(id), reason))?;

    if !seen.insert(id.clone()) {
        return Err(SkippedRecord::new(kind, Some(id), "duplicate id"));
    }

    Ok(record)
}

/// A loaded snapshot plus the externally supplied scan counter.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dataset: Arc<Dataset>,
    pub recent_scans: u64,
}

/// Where snapshots come from.
#[derive(Clone)]
pub enum DatasetSource {
    /// The built-in sample records.
    Fixtures { recent_scans: u64 },
    /// Records persisted in sqlite.
    Sqlite {
        storage: Storage,
        scan_window_days: u32,
    },
    /// A remote snapshot service.
    Remote(SnapshotClient),
}

static FIXTURE_DATASET: OnceLock<Arc<Dataset>> = OnceLock::new();

impl DatasetSource {
    /// Fixture source with the default scan counter.
    pub fn fixtures() -> Self {
        DatasetSource::Fixtures {
            recent_scans: fixtures::FIXTURE_RECENT_SCANS,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetSource::Fixtures { .. } => "fixtures",
            DatasetSource::Sqlite { .. } => "sqlite",
            DatasetSource::Remote(_) => "remote",
        }
    }

    /// The backing store, when this source persists scans.
    pub fn storage(&self) -> Option<&Storage> {
        match self {
            DatasetSource::Sqlite { storage, .. } => Some(storage),
            _ => None,
        }
    }

    /// Load a fresh snapshot.
    ///
    /// Fixtures are ingested once per process and shared afterwards.
    pub async fn load(&self) -> Result<Snapshot, DataError> {
        match self {
            DatasetSource::Fixtures { recent_scans } => {
                let dataset = FIXTURE_DATASET
                    .get_or_init(|| Arc::new(Dataset::from_raw(fixtures::raw_dataset())))
                    .clone();
                Ok(Snapshot {
                    dataset,
                    recent_scans: *recent_scans,
                })
            }
            DatasetSource::Sqlite {
                storage,
                scan_window_days,
            } => {
                let raw = storage.load_raw().await.map_err(DataError::unavailable)?;
                let since = Utc::now() - Duration::days(i64::from(*scan_window_days));
                let recent_scans = storage
                    .count_scans_since(since)
                    .await
                    .map_err(DataError::unavailable)?;

                let dataset = Dataset::from_raw(raw);
                info!(
                    source = "sqlite",
                    events = dataset.collection_events.len(),
                    skipped = dataset.skipped_count(),
                    "Snapshot loaded"
                );
                Ok(Snapshot {
                    dataset: Arc::new(dataset),
                    recent_scans,
                })
            }
            DatasetSource::Remote(client) => {
                let raw = client
                    .fetch_snapshot()
                    .await
                    .map_err(DataError::unavailable)?;
                let recent_scans = raw.recent_scans.unwrap_or(0);

                let dataset = Dataset::from_raw(raw);
                info!(
                    source = "remote",
                    events = dataset.collection_events.len(),
                    skipped = dataset.skipped_count(),
                    "Snapshot loaded"
                );
                Ok(Snapshot {
                    dataset: Arc::new(dataset),
                    recent_scans,
                })
            }
        }
    }
}
