//! Data models for Herbtrace.
//!
//! Records mirror the dashboard's native JSON format (camelCase fields,
//! lower-case or kebab-case enum values). All records are immutable once
//! ingested; a new snapshot replaces the old one rather than mutating it.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of enum values that can be counted with zero-fill.
///
/// `ALL` lists every variant in declaration order, which is also the
/// order chart series are rendered in.
pub trait StatusField: Copy + Ord + 'static {
    const ALL: &'static [Self];
}

/// The kinds of record a snapshot carries, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    User,
    CollectionEvent,
    ProcessingStep,
    QualityTest,
    Batch,
    Recall,
}

impl RecordKind {
    /// Stable key used by the sqlite store.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::CollectionEvent => "collection_event",
            RecordKind::ProcessingStep => "processing_step",
            RecordKind::QualityTest => "quality_test",
            RecordKind::Batch => "batch",
            RecordKind::Recall => "recall",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "user" => Some(RecordKind::User),
            "collection_event" => Some(RecordKind::CollectionEvent),
            "processing_step" => Some(RecordKind::ProcessingStep),
            "quality_test" => Some(RecordKind::QualityTest),
            "batch" => Some(RecordKind::Batch),
            "recall" => Some(RecordKind::Recall),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Processor,
    Lab,
    Manufacturer,
    Regulator,
}

/// A supply-chain participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// ============================================================================
// Geolocation
// ============================================================================

/// A GPS fix attached to collection and processing records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationData {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in metres.
    pub accuracy: f64,
}

impl GeolocationData {
    /// Check coordinate ranges and accuracy.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} out of range [-90, 90]", self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            ));
        }
        if !self.accuracy.is_finite() || self.accuracy < 0.0 {
            return Err(format!("accuracy {} must be non-negative", self.accuracy));
        }
        if let Some(altitude) = self.altitude {
            if !altitude.is_finite() {
                return Err("altitude must be finite".to_string());
            }
        }
        Ok(())
    }
}

/// Scores and ratings feed averaged KPIs, which must never go negative.
fn non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} {} must be a non-negative number", field, value));
    }
    Ok(())
}

// ============================================================================
// Collection events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityUnit {
    Kg,
    Tons,
}

impl QuantityUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityUnit::Kg => "kg",
            QuantityUnit::Tons => "tons",
        }
    }

    pub fn kg_factor(&self) -> f64 {
        match self {
            QuantityUnit::Kg => 1.0,
            QuantityUnit::Tons => 1000.0,
        }
    }
}

/// Classification of a harvest relative to permitted harvesting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Compliant,
    Violation,
    Pending,
}

impl StatusField for ComplianceStatus {
    const ALL: &'static [Self] = &[
        ComplianceStatus::Compliant,
        ComplianceStatus::Violation,
        ComplianceStatus::Pending,
    ];
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::Violation => "violation",
            ComplianceStatus::Pending => "pending",
        }
    }
}

/// Why a harvest was flagged upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationReason {
    /// Collected outside an approved harvesting zone.
    GeoFence,
    /// Collected outside the permitted season.
    Seasonal,
}

/// Compliance as a single tagged value with its reasons attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Compliance {
    Compliant,
    Pending,
    Violation { reasons: Vec<ViolationReason> },
}

/// One harvest event recorded by a farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    pub id: String,
    pub batch_id: String,
    /// Free text, conventionally "Common (Latin binomial)".
    pub species: String,
    pub farmer_id: String,
    pub farmer_name: String,
    pub location: GeolocationData,
    pub timestamp: DateTime<Utc>,
    pub quantity: f64,
    pub unit: QuantityUnit,
    pub compliance_status: ComplianceStatus,
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Conventionally 0-10.
    pub sustainability_score: f64,
    #[serde(default)]
    pub geo_fence_violation: bool,
    #[serde(default)]
    pub seasonal_violation: bool,
}

impl CollectionEvent {
    /// Quantity normalized to kilograms.
    pub fn quantity_kg(&self) -> f64 {
        self.quantity * self.unit.kg_factor()
    }

    /// The species name without its botanical qualifier.
    pub fn common_name(&self) -> &str {
        match self.species.find(" (") {
            Some(idx) => &self.species[..idx],
            None => self.species.trim(),
        }
    }

    /// The violation flags that are set, in a fixed order.
    pub fn violation_reasons(&self) -> Vec<ViolationReason> {
        let mut reasons = Vec::new();
        if self.geo_fence_violation {
            reasons.push(ViolationReason::GeoFence);
        }
        if self.seasonal_violation {
            reasons.push(ViolationReason::Seasonal);
        }
        reasons
    }

    pub fn compliance(&self) -> Compliance {
        match self.compliance_status {
            ComplianceStatus::Compliant => Compliance::Compliant,
            ComplianceStatus::Pending => Compliance::Pending,
            ComplianceStatus::Violation => Compliance::Violation {
                reasons: self.violation_reasons(),
            },
        }
    }

    /// False when a violation flag is set on a record not classified as a
    /// violation. Upstream never reconciles the two, so this is reported,
    /// not enforced.
    pub fn has_consistent_flags(&self) -> bool {
        self.compliance_status == ComplianceStatus::Violation
            || !(self.geo_fence_violation || self.seasonal_violation)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.location.validate()?;
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(format!("quantity {} must be positive", self.quantity));
        }
        non_negative("sustainability score", self.sustainability_score)?;
        Ok(())
    }
}

// ============================================================================
// Processing and testing
// ============================================================================

/// A scalar value in an open metadata or results map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepType {
    Drying,
    Grinding,
    Testing,
    Packaging,
    QualityCheck,
}

impl StepType {
    pub fn label(&self) -> &'static str {
        match self {
            StepType::Drying => "Drying",
            StepType::Grinding => "Grinding",
            StepType::Testing => "Testing",
            StepType::Packaging => "Packaging",
            StepType::QualityCheck => "Quality check",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Completed,
    InProgress,
    Pending,
    Failed,
}

impl StatusField for StepStatus {
    const ALL: &'static [Self] = &[
        StepStatus::Completed,
        StepStatus::InProgress,
        StepStatus::Pending,
        StepStatus::Failed,
    ];
}

/// One processing action applied to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStep {
    pub id: String,
    pub batch_id: String,
    pub step_type: StepType,
    pub processor_id: String,
    pub processor_name: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
    #[serde(default)]
    pub certificate_ids: Vec<String>,
    pub location: GeolocationData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Contaminants,
    Potency,
    Purity,
    Microbiological,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Contaminants => "contaminants",
            TestType::Potency => "potency",
            TestType::Purity => "purity",
            TestType::Microbiological => "microbiological",
        }
    }
}

/// A laboratory test on a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTest {
    pub id: String,
    pub batch_id: String,
    pub test_type: TestType,
    pub lab_id: String,
    pub lab_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub results: HashMap<String, MetadataValue>,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_url: Option<String>,
}

// ============================================================================
// Batches and recalls
// ============================================================================

/// Where a batch sits in its lifecycle.
///
/// The lifecycle is linear from `Collection` to `Distribution`; `Recalled`
/// is a side state reachable from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Collection,
    Processing,
    Testing,
    Packaging,
    Distribution,
    Recalled,
}

impl StatusField for BatchStatus {
    const ALL: &'static [Self] = &[
        BatchStatus::Collection,
        BatchStatus::Processing,
        BatchStatus::Testing,
        BatchStatus::Packaging,
        BatchStatus::Distribution,
        BatchStatus::Recalled,
    ];
}

impl BatchStatus {
    /// The next lifecycle stage, if any.
    pub fn next(&self) -> Option<BatchStatus> {
        match self {
            BatchStatus::Collection => Some(BatchStatus::Processing),
            BatchStatus::Processing => Some(BatchStatus::Testing),
            BatchStatus::Testing => Some(BatchStatus::Packaging),
            BatchStatus::Packaging => Some(BatchStatus::Distribution),
            BatchStatus::Distribution | BatchStatus::Recalled => None,
        }
    }
}

/// The aggregate unit of traceability for one harvested lot.
///
/// Child records reference the batch through their `batch_id`; use
/// [`crate::dataset::Dataset::batch_trace`] to assemble them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub qr_code: String,
    pub species: String,
    pub status: BatchStatus,
    pub sustainability_score: f64,
    pub compliance_rating: f64,
    #[serde(default)]
    pub fair_trade_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn validate(&self) -> Result<(), String> {
        if self.qr_code.trim().is_empty() {
            return Err("qr code must not be empty".to_string());
        }
        if self.updated_at < self.created_at {
            return Err("updatedAt precedes createdAt".to_string());
        }
        non_negative("sustainability score", self.sustainability_score)?;
        non_negative("compliance rating", self.compliance_rating)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RecallSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            RecallSeverity::Low => "Low",
            RecallSeverity::Medium => "Medium",
            RecallSeverity::High => "High",
            RecallSeverity::Critical => "Critical",
        }
    }
}

impl StatusField for RecallSeverity {
    const ALL: &'static [Self] = &[
        RecallSeverity::Low,
        RecallSeverity::Medium,
        RecallSeverity::High,
        RecallSeverity::Critical,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecallStatus {
    Initiated,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallEvent {
    pub id: String,
    pub batch_ids: Vec<String>,
    pub reason: String,
    pub severity: RecallSeverity,
    pub status: RecallStatus,
    pub initiated_by: String,
    pub timestamp: DateTime<Utc>,
    pub affected_products: u32,
    /// Percentage of affected products recovered so far.
    pub recovery_rate: f64,
}

impl RecallEvent {
    pub fn is_active(&self) -> bool {
        self.status != RecallStatus::Completed
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.recovery_rate.is_finite() || !(0.0..=100.0).contains(&self.recovery_rate) {
            return Err(format!(
                "recovery rate {} out of range [0, 100]",
                self.recovery_rate
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Derived outputs
// ============================================================================

/// Dashboard headline figures.
///
/// Never stored; always derived from a snapshot by
/// [`crate::aggregation::compute_kpis`]. Percentages are in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiData {
    pub compliance_rate: f64,
    pub seasonal_compliance_rate: f64,
    pub fair_trade_percentage: f64,
    pub sustainability_score: f64,
    pub active_recalls: usize,
    pub total_batches: usize,
    pub recent_scans: u64,
}

/// Request body for POST /scans.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub qr_code: String,
}
