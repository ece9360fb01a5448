//! Error types for Herbtrace.
//!
//! Loading a snapshot can fail in two very different ways. A single record
//! can be unreadable, which is never fatal: the record is skipped and reported.
//! The whole source can be unreachable, which is fatal for that snapshot and
//! must be surfaced to the dashboard as an explicit empty state.

use thiserror::Error;

use crate::model::RecordKind;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Malformed {kind} record {}: {reason}", .id.as_deref().unwrap_or("<unknown id>"))]
    MalformedRecord {
        kind: RecordKind,
        id: Option<String>,
        reason: String,
    },

    #[error("Dataset unavailable: {0}")]
    Unavailable(String),
}

impl DataError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        DataError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown data source: {0} (expected fixtures, sqlite or remote)")]
    UnknownDataSource(String),

    #[error("HERBTRACE_SNAPSHOT_URL is required for the remote data source")]
    MissingSnapshotUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_with_id() {
        let err = DataError::MalformedRecord {
            kind: RecordKind::CollectionEvent,
            id: Some("ce-009".to_string()),
            reason: "bad unit".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed collection event record ce-009: bad unit"
        );
    }

    #[test]
    fn test_malformed_display_without_id() {
        let err = DataError::MalformedRecord {
            kind: RecordKind::Recall,
            id: None,
            reason: "not an object".to_string(),
        };
        assert!(err.to_string().contains("<unknown id>"));
    }
}
