//! Record classification and list filtering for table views and export.

use crate::record::{DeveloperRecord, Grade};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Progress stage of one developer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Certified,
    NotStarted,
    JustStarted,
    InProgress,
    CourseCompleteNoCert,
}

impl RecordStatus {
    pub fn of(r: &DeveloperRecord) -> Self {
        if r.final_grade == Grade::Pass {
            return Self::Certified;
        }
        match r.percentage_completed {
            0       => Self::NotStarted,
            1..=29  => Self::JustStarted,
            30..=99 => Self::InProgress,
            _       => Self::CourseCompleteNoCert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Stage(RecordStatus),
    Flagged,
    DataError,
}

impl StatusFilter {
    pub fn matches(&self, r: &DeveloperRecord) -> bool {
        match self {
            Self::All          => true,
            Self::Stage(stage) => RecordStatus::of(r) == *stage,
            Self::Flagged      => r.is_suspicious,
            Self::DataError    => r.data_error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub status: StatusFilter,
    /// Exact partner code; `None` keeps every community.
    pub community: Option<String>,
    /// Case-insensitive substring over email, names and partner code.
    pub search: Option<String>,
}

impl RecordQuery {
    pub fn matches(&self, r: &DeveloperRecord) -> bool {
        if !self.status.matches(r) {
            return false;
        }
        if self.community.as_deref().is_some_and(|c| r.partner_code != c) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let q = q.to_lowercase();
                [&r.email, &r.first_name, &r.last_name, &r.partner_code]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q))
            }
        }
    }

    pub fn apply<'a>(&self, records: &'a [DeveloperRecord]) -> Vec<&'a DeveloperRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Sorted distinct partner codes, sentinel excluded.
pub fn communities(records: &[DeveloperRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.has_community())
        .map(|r| r.partner_code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
