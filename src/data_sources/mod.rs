//! External data sources for supply-chain snapshots.
//!
//! # Data Sources
//!
//! - [`snapshot`]: A remote service that serves the whole dataset as one
//!   JSON document

pub mod snapshot;

pub use snapshot::SnapshotClient;
