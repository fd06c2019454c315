//! Immutable dataset versions and the active-version history.

use crate::{
    error::{IngestError, IngestResult},
    record::DeveloperRecord,
    types::VersionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One successful ingestion. Never edited; a re-upload supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    pub id: VersionId,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub record_count: usize,
    pub data: Vec<DeveloperRecord>,
}

impl DatasetVersion {
    pub fn records(&self) -> &[DeveloperRecord] {
        &self.data
    }

    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            upload_date: self.upload_date,
            record_count: self.record_count,
        }
    }
}

/// Version metadata without the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: VersionId,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub record_count: usize,
}

/// Uploaded versions, oldest first, plus which one is active.
/// Switching the active version swaps a shared handle; readers holding
/// the previous `Arc` keep a consistent view.
#[derive(Debug, Clone, Default)]
pub struct DatasetHistory {
    versions: Vec<Arc<DatasetVersion>>,
    active: Option<VersionId>,
}

impl DatasetHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version and make it active.
    pub fn push(&mut self, version: DatasetVersion) -> Arc<DatasetVersion> {
        let handle = Arc::new(version);
        self.active = Some(handle.id.clone());
        self.versions.push(Arc::clone(&handle));
        handle
    }

    pub fn select(&mut self, id: &str) -> IngestResult<Arc<DatasetVersion>> {
        let handle = self.get(id).ok_or_else(|| IngestError::VersionNotFound { id: id.to_string() })?;
        self.active = Some(handle.id.clone());
        Ok(handle)
    }

    /// Drop a version. If it was active, the newest remaining one takes over.
    pub fn remove(&mut self, id: &str) -> IngestResult<()> {
        let pos = self
            .versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| IngestError::VersionNotFound { id: id.to_string() })?;
        self.versions.remove(pos);
        if self.active.as_deref() == Some(id) {
            self.active = self.versions.last().map(|v| v.id.clone());
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<DatasetVersion>> {
        self.versions.iter().find(|v| v.id == id).cloned()
    }

    pub fn active(&self) -> Option<Arc<DatasetVersion>> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
