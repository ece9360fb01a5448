//! Herbtrace - derived metrics and filtering for herbal supply-chain dashboards.
//!
//! # Overview
//!
//! Herbtrace turns a snapshot of supply-chain records (harvest collection
//! events, processing steps, quality tests, batches and recalls) into the
//! figures a traceability dashboard renders: compliance and sustainability
//! KPIs, status breakdowns, filtered harvest lists and an activity feed.
//!
//! Every computation is a pure function of an immutable snapshot. Records
//! arrive already classified upstream; Herbtrace aggregates and filters them,
//! it does not decide compliance.
//!
//! # Modules
//!
//! - [`model`]: Domain records and derived output types
//! - [`dataset`]: Snapshot ingestion and dataset sources
//! - [`aggregation`]: KPI and grouped-count computations
//! - [`filter`]: Collection-event filtering
//! - [`activity`]: Recent-activity feed
//! - [`dashboard`]: Dashboard payloads over a source
//! - [`storage`]: SQLite record store
//! - [`data_sources`]: Remote snapshot client
//! - [`api`]: HTTP API handlers

pub mod activity;
pub mod aggregation;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod data_sources;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod fixtures;
pub mod model;
pub mod storage;
