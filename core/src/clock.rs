//! Processing clock: the single source of "now" for ingestion.
//!
//! RULE: Nothing in the core reads the system time directly.
//! Synthetic ids, the unparseable-date fallback, upload timestamps and
//! relative timeframes all ask the clock, so tests can pin it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", content = "at", rename_all = "snake_case")]
pub enum IngestClock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl IngestClock {
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System   => Utc::now(),
            Self::Fixed(t) => *t,
        }
    }
}
