//! The canonical developer-certification record and its closed enums.
//!
//! Records move through three stages (raw row -> normalized -> annotated).
//! Each stage returns a new value; nothing downstream of screening
//! mutates a record.

use crate::types::{RecordId, UNKNOWN_PARTNER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One split CSV line. Cells are positional until mapped by a ColumnMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based line index in the file; the header is line 0.
    pub line_index: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    /// Cell at `idx`, or "" when the column is absent or the row is short.
    pub fn cell(&self, idx: Option<usize>) -> &str {
        idx.and_then(|i| self.cells.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Grade {
    Pass,
    Fail,
    #[default]
    Pending,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::Pass    => "Pass",
            Grade::Fail    => "Fail",
            Grade::Pending => "Pending",
        };
        f.write_str(s)
    }
}

/// Advisory fraud heuristics. Declaration order is detection order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SuspicionFlag {
    #[serde(rename = "Bot Activity (<30m)")]
    BotActivity,
    #[serde(rename = "Speed Run (<4h)")]
    SpeedRun,
    #[serde(rename = "Email Alias")]
    EmailAlias,
    #[serde(rename = "Disposable Email")]
    DisposableEmail,
    #[serde(rename = "Sybil (Shared Wallet)")]
    SharedWallet,
}

impl SuspicionFlag {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BotActivity     => "Bot Activity (<30m)",
            Self::SpeedRun        => "Speed Run (<4h)",
            Self::EmailAlias      => "Email Alias",
            Self::DisposableEmail => "Disposable Email",
            Self::SharedWallet    => "Sybil (Shared Wallet)",
        }
    }
}

impl fmt::Display for SuspicionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperRecord {
    pub id: RecordId,

    // ── Contact ───────────────────────────────────────
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub country: String,

    // ── Consent ───────────────────────────────────────
    pub accepted_membership: bool,
    pub accepted_marketing: bool,

    // ── Chain identity ────────────────────────────────
    pub wallet_address: String,

    // ── Program state ─────────────────────────────────
    pub partner_code: String,
    pub percentage_completed: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_score: i64,
    pub final_grade: Grade,
    pub ca_status: String,

    /// At least one non-empty date failed to parse and was replaced by
    /// the processing time.
    #[serde(default)]
    pub date_fallback_applied: bool,

    // ── Enrichment (computed during screening) ────────
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub is_suspicious: bool,
    #[serde(default)]
    pub suspicion_reasons: Vec<SuspicionFlag>,
    #[serde(default)]
    pub data_error: bool,
}

impl DeveloperRecord {
    /// Comma-joined suspicion labels in detection order.
    pub fn suspicion_reason(&self) -> String {
        self.suspicion_reasons
            .iter()
            .map(SuspicionFlag::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_certified(&self) -> bool {
        self.percentage_completed == 100
    }

    pub fn has_community(&self) -> bool {
        !self.partner_code.is_empty() && self.partner_code != UNKNOWN_PARTNER
    }
}
