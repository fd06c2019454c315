//! Fraud / integrity screening.
//!
//! Two passes over one dataset version:
//!   1. Build the wallet frequency map across every record.
//!   2. Screen each record against the completed map.
//!
//! Pass 2 has no cross-record dependency; the map is passed by reference
//! and dropped when screening returns. Flags are advisory heuristics,
//! never verdicts.

use crate::{
    config::FraudConfig,
    record::{DeveloperRecord, Grade, SuspicionFlag},
};
use std::collections::HashMap;

/// Occurrence count per normalized wallet, scoped to one screening run.
#[derive(Debug, Clone, Default)]
pub struct WalletFrequencyMap {
    counts: HashMap<String, usize>,
}

impl WalletFrequencyMap {
    pub fn build(records: &[DeveloperRecord], config: &FraudConfig) -> Self {
        let mut counts = HashMap::new();
        for r in records {
            if let Some(w) = wallet_key(&r.wallet_address, config) {
                *counts.entry(w).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Occurrences of this wallet (after normalization); 0 when ignored.
    pub fn count(&self, wallet: &str, config: &FraudConfig) -> usize {
        wallet_key(wallet, config)
            .and_then(|w| self.counts.get(&w).copied())
            .unwrap_or(0)
    }

    pub fn shared_wallets(&self) -> usize {
        self.counts.values().filter(|&&c| c > 1).count()
    }
}

/// Trimmed, lower-cased wallet, or None for short or placeholder values.
pub fn wallet_key(wallet: &str, config: &FraudConfig) -> Option<String> {
    let w = wallet.trim().to_lowercase();
    if w.chars().count() < config.min_wallet_len || w == "n/a" || w == "none" {
        return None;
    }
    Some(w)
}

/// Timing outcome for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Timing {
    duration_hours: Option<f64>,
    data_error: bool,
    flag: Option<SuspicionFlag>,
}

fn assess_timing(record: &DeveloperRecord, config: &FraudConfig) -> Timing {
    let (created, completed) = match (record.created_at, record.completed_at) {
        (Some(c), Some(d)) => (c, d),
        _ => return Timing { duration_hours: None, data_error: false, flag: None },
    };
    let hours = (completed - created).num_milliseconds() as f64 / 3_600_000.0;

    if hours < 0.0 {
        return Timing { duration_hours: Some(hours), data_error: true, flag: None };
    }

    // A fabricated timestamp is not evidence of anything.
    let flag = if record.date_fallback_applied || record.final_grade != Grade::Pass {
        None
    } else if hours < config.bot_activity_hours {
        Some(SuspicionFlag::BotActivity)
    } else if hours < config.speed_run_hours {
        Some(SuspicionFlag::SpeedRun)
    } else {
        None
    };
    Timing { duration_hours: Some(hours), data_error: false, flag }
}

/// Screen one record against a completed wallet map. Returns the
/// annotated record; the input is consumed, not mutated in place.
pub fn screen_record(
    record: DeveloperRecord,
    wallets: &WalletFrequencyMap,
    config: &FraudConfig,
) -> DeveloperRecord {
    let timing = assess_timing(&record, config);
    let mut flags: Vec<SuspicionFlag> = timing.flag.into_iter().collect();

    let email = record.email.to_lowercase();
    let (local, domain) = match email.split_once('@') {
        Some((l, d)) => (l, Some(d)),
        None => (email.as_str(), None),
    };
    if local.contains('+') {
        flags.push(SuspicionFlag::EmailAlias);
    }
    if domain.is_some_and(|d| config.is_disposable(d)) {
        flags.push(SuspicionFlag::DisposableEmail);
    }
    if wallets.count(&record.wallet_address, config) > 1 {
        flags.push(SuspicionFlag::SharedWallet);
    }

    DeveloperRecord {
        duration_hours: timing.duration_hours,
        data_error: timing.data_error,
        is_suspicious: !flags.is_empty(),
        suspicion_reasons: flags,
        ..record
    }
}

/// Summary counts from one screening run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreeningSummary {
    pub suspicious: usize,
    pub data_errors: usize,
    pub shared_wallets: usize,
}

/// Run both passes over a dataset, preserving record order.
pub fn screen_dataset(
    records: Vec<DeveloperRecord>,
    config: &FraudConfig,
) -> (Vec<DeveloperRecord>, ScreeningSummary) {
    let wallets = WalletFrequencyMap::build(&records, config);

    let screened: Vec<DeveloperRecord> = records
        .into_iter()
        .map(|r| screen_record(r, &wallets, config))
        .collect();

    let summary = ScreeningSummary {
        suspicious: screened.iter().filter(|r| r.is_suspicious).count(),
        data_errors: screened.iter().filter(|r| r.data_error).count(),
        shared_wallets: wallets.shared_wallets(),
    };
    log::info!(
        "Screened {} record(s): {} suspicious, {} data error(s), {} shared wallet(s)",
        screened.len(),
        summary.suspicious,
        summary.data_errors,
        summary.shared_wallets
    );
    (screened, summary)
}
