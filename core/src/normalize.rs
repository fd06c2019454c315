//! Field normalizer: coerces one raw row into a typed DeveloperRecord.
//!
//! Coercion never fails a row: bad numbers become 0, bad grades become
//! Pending, and unparseable dates become the processing time with
//! `date_fallback_applied` set on the record.

use crate::{
    header::ColumnMap,
    record::{DeveloperRecord, Grade, RawRow},
    types::UNKNOWN_PARTNER,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Naive date-time layouts tried after RFC 3339. Naive values are UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// Outcome of parsing one date cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Absent,
    Parsed(DateTime<Utc>),
    /// Text was present but unreadable; holds the processing time.
    Fallback(DateTime<Utc>),
}

impl ParsedDate {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Absent                       => None,
            Self::Parsed(t) | Self::Fallback(t) => Some(*t),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Processing-time inputs shared by every row of one ingestion.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    pub now: DateTime<Utc>,
    /// Generation stamp embedded in synthetic ids.
    pub stamp: i64,
}

pub fn parse_date(raw: &str, now: DateTime<Utc>) -> ParsedDate {
    let s = raw.trim();
    if s.is_empty() {
        return ParsedDate::Absent;
    }
    if s.contains('/') {
        if let Some(day_first) = day_first_candidate(s) {
            return match day_first {
                Some(t) => ParsedDate::Parsed(t),
                None    => ParsedDate::Fallback(now),
            };
        }
    }
    match parse_default(s) {
        Some(t) => ParsedDate::Parsed(t),
        None    => ParsedDate::Fallback(now),
    }
}

/// `Some(_)` when the text must be read day-first (leading component in
/// 13..=31); the inner option is the parse result.
fn day_first_candidate(s: &str) -> Option<Option<DateTime<Utc>>> {
    let (date_part, time_part) = match s.split_once(char::is_whitespace) {
        Some((d, t)) => (d, Some(t.trim())),
        None         => (s, None),
    };
    let parts: Vec<&str> = date_part.split('/').collect();
    let first: u32 = leading_digits(parts.first()?)?;
    if !(13..=31).contains(&first) {
        return None;
    }
    if parts.len() != 3 {
        return Some(None);
    }
    let parsed = (|| {
        let month: u32 = parts[1].trim().parse().ok()?;
        let year: i32 = parts[2].trim().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, first)?;
        let time = match time_part {
            Some(t) if !t.is_empty() => parse_time(t)?,
            _ => NaiveTime::MIN,
        };
        Some(NaiveDateTime::new(date, time).and_utc())
    })();
    Some(parsed)
}

fn leading_digits(s: &str) -> Option<u32> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
}

fn parse_default(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(t.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc())
}

pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}

/// Keep digits, `.` and `-`, read the leading number, round half up.
/// Anything unreadable is 0.
pub fn parse_int(raw: &str) -> i64 {
    let clean: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match leading_number(&clean) {
        Some(v) if v.is_finite() => (v + 0.5).floor() as i64,
        _ => 0,
    }
}

fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse().ok()
}

pub fn parse_grade(raw: &str) -> Grade {
    let s = raw.trim().to_lowercase();
    if s.contains("pass") {
        Grade::Pass
    } else if s == "fail" || s == "failed" {
        Grade::Fail
    } else {
        Grade::Pending
    }
}

/// Wallet text as supplied, except the `n/a` / `none` placeholders.
pub fn normalize_wallet(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("n/a") || trimmed.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn or_default(value: &str, default: impl FnOnce() -> String) -> String {
    if value.is_empty() { default() } else { value.to_string() }
}

/// Coerce one raw row. Enrichment fields are left at their defaults.
pub fn normalize_row(row: &RawRow, columns: &ColumnMap, ctx: &NormalizeContext) -> DeveloperRecord {
    let i = row.line_index;
    let created = parse_date(row.cell(columns.created_at), ctx.now);
    let completed = parse_date(row.cell(columns.completed_at), ctx.now);

    DeveloperRecord {
        id: format!("row_{i}_{}", ctx.stamp),
        email: or_default(row.cell(columns.email), || format!("unknown_{i}@noemail.com")),
        first_name: row.cell(columns.first_name).to_string(),
        last_name: row.cell(columns.last_name).to_string(),
        phone: row.cell(columns.phone).to_string(),
        country: or_default(row.cell(columns.country), || "Unknown".to_string()),
        accepted_membership: parse_bool(row.cell(columns.membership_accepted)),
        accepted_marketing: parse_bool(row.cell(columns.marketing_accepted)),
        wallet_address: normalize_wallet(row.cell(columns.wallet_address)),
        partner_code: or_default(row.cell(columns.partner_code), || UNKNOWN_PARTNER.to_string()),
        percentage_completed: parse_int(row.cell(columns.percentage_completed)).clamp(0, 100) as u32,
        created_at: created.instant(),
        completed_at: completed.instant(),
        final_score: parse_int(row.cell(columns.final_score)),
        final_grade: parse_grade(row.cell(columns.final_grade)),
        ca_status: row.cell(columns.ca_status).to_string(),
        date_fallback_applied: created.is_fallback() || completed.is_fallback(),
        duration_hours: None,
        is_suspicious: false,
        suspicion_reasons: Vec::new(),
        data_error: false,
    }
}

/// Source exports drop the AM/PM marker on 12-hour clock values, so a
/// completion can land 12h before its start. Shift it forward once.
pub fn repair_am_pm(record: DeveloperRecord) -> DeveloperRecord {
    match (record.created_at, record.completed_at) {
        (Some(created), Some(completed)) if completed < created => DeveloperRecord {
            completed_at: Some(completed + Duration::hours(12)),
            ..record
        },
        _ => record,
    }
}
