//! certlens-core: developer-certification CSV ingestion, integrity
//! screening and reporting metrics.
//!
//! PIPELINE: header -> parser -> normalize -> fraud -> dataset.
//! Metrics, queries, reports and export read finished versions only.

pub mod clock;
pub mod config;
pub mod dataset;
pub mod error;
pub mod event;
pub mod export;
pub mod fixture;
pub mod fraud;
pub mod header;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod record;
pub mod report;
pub mod splitter;
pub mod store;
pub mod summary;
pub mod timeframe;
pub mod types;
