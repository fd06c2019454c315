//! Ingestion events: progress and milestones reported to the host.
//!
//! Variants are only ever appended; hosts may persist them by name.

use crate::{parser::BatchProgress, types::VersionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    IngestionStarted {
        file_name: String,
        delimiter: char,
        headers: Vec<String>,
        data_rows: usize,
    },
    BatchProcessed {
        progress: BatchProgress,
    },
    RecordsScreened {
        records: usize,
        suspicious: usize,
        data_errors: usize,
        shared_wallets: usize,
    },
    IngestionCompleted {
        version_id: VersionId,
        record_count: usize,
        rows_skipped: usize,
    },
}

impl IngestEvent {
    /// Stable name used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::IngestionStarted { .. }   => "ingestion_started",
            Self::BatchProcessed { .. }     => "batch_processed",
            Self::RecordsScreened { .. }    => "records_screened",
            Self::IngestionCompleted { .. } => "ingestion_completed",
        }
    }
}

/// A persisted event, as stored by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub version_id: VersionId,
    pub event_type: String,
    pub payload: String,
}
