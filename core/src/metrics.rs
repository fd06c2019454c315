//! Metrics aggregation over an immutable record slice.
//!
//! Every function here is pure: same records + same window = same output.
//! Safe to call concurrently for different windows over one dataset.

use crate::{
    config::MetricsConfig,
    record::{DeveloperRecord, Grade},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const DAY_MS: i64 = 86_400_000;

// ── Windows ──────────────────────────────────────────────────────────────────

/// Inclusive instant range; a missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// Whole days from the first to the last date, inclusive.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self::between(start_of_day(first), end_of_day(last))
    }

    pub fn contains(&self, instant: Option<DateTime<Utc>>) -> bool {
        let Some(t) = instant else { return false };
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Length in days, rounded up. Only defined with both bounds.
    pub fn span_days(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(ceil_days(e - s)),
            _ => None,
        }
    }

    /// The equally long period immediately before this one.
    pub fn previous_period(&self) -> Option<DateWindow> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(previous_period(s, e)),
            _ => None,
        }
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable millisecond of `date`.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => start_of_day(next) - Duration::milliseconds(1),
        None => date
            .and_hms_milli_opt(23, 59, 59, 999)
            .map_or_else(|| start_of_day(date), |t| t.and_utc()),
    }
}

fn ceil_days(d: Duration) -> i64 {
    let ms = d.num_milliseconds().abs();
    (ms + DAY_MS - 1) / DAY_MS
}

/// Previous period for `[start, end]`: ends at 23:59:59.999 on the day
/// before `start` and begins as many calendar days before that as `end`
/// lies after `start`, so both periods cover the same number of days.
pub fn previous_period(start: DateTime<Utc>, end: DateTime<Utc>) -> DateWindow {
    let span = (end.date_naive() - start.date_naive()).num_days().abs();
    let prev_last = start.date_naive() - Duration::days(1);
    let prev_first = prev_last - Duration::days(span);
    DateWindow::between(start_of_day(prev_first), end_of_day(prev_last))
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

// ── Summary counters ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_registered: usize,
    pub total_certified: usize,
    pub users_started_course: usize,
    pub users_started_course_pct: f64,
    pub active_communities: usize,
    pub avg_completion_time_days: f64,
    pub certification_rate: f64,
    pub overall_subscriber_rate: f64,
    pub potential_fake_accounts: usize,
    pub potential_fake_accounts_pct: f64,
    pub rapid_completions: usize,
}

pub fn calculate_dashboard_metrics(
    records: &[DeveloperRecord],
    window: &DateWindow,
    config: &MetricsConfig,
) -> DashboardMetrics {
    let mut registered = 0;
    let mut certified = 0;
    let mut started = 0;
    let mut subscribers = 0;
    let mut fake = 0;
    let mut rapid = 0;
    let mut duration_sum_hours = 0.0;
    let mut duration_count = 0usize;
    let mut communities: HashSet<&str> = HashSet::new();

    for r in records {
        let in_registration = window.contains(r.created_at);
        let in_completion = window.contains(r.completed_at);

        if in_registration {
            registered += 1;
            if r.percentage_completed > 0 { started += 1; }
            if r.accepted_marketing { subscribers += 1; }
            if r.is_suspicious { fake += 1; }
        }

        if (in_registration || in_completion) && r.has_community() {
            communities.insert(r.partner_code.as_str());
        }

        if r.is_certified() && in_completion {
            certified += 1;
            if r.data_error {
                continue;
            }
            if let Some(hours) = r.duration_hours {
                if hours > 0.0 {
                    duration_sum_hours += hours;
                    duration_count += 1;
                }
                if r.final_grade == Grade::Pass
                    && hours >= 0.0
                    && hours < config.rapid_completion_hours
                {
                    rapid += 1;
                }
            }
        }
    }

    let avg_completion_time_days = if duration_count > 0 {
        duration_sum_hours / duration_count as f64 / 24.0
    } else {
        0.0
    };

    DashboardMetrics {
        total_registered: registered,
        total_certified: certified,
        users_started_course: started,
        users_started_course_pct: rate(started, registered),
        active_communities: communities.len(),
        avg_completion_time_days,
        certification_rate: rate(certified, registered),
        overall_subscriber_rate: rate(subscribers, registered),
        potential_fake_accounts: fake,
        potential_fake_accounts_pct: rate(fake, registered),
        rapid_completions: rapid,
    }
}

// ── Membership ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipMetrics {
    pub total_enrolled: usize,
    pub total_members: usize,
    pub membership_rate: f64,
    pub certified_members: usize,
    pub certified_member_rate: f64,
    pub active_communities: usize,
}

pub fn calculate_membership_metrics(
    records: &[DeveloperRecord],
    window: &DateWindow,
) -> MembershipMetrics {
    let enrolled: Vec<&DeveloperRecord> =
        records.iter().filter(|r| window.contains(r.created_at)).collect();
    let members: Vec<&DeveloperRecord> =
        enrolled.iter().copied().filter(|r| r.accepted_membership).collect();
    let certified_members = members.iter().filter(|r| r.final_grade == Grade::Pass).count();
    let active_communities = members
        .iter()
        .filter(|r| r.has_community())
        .map(|r| r.partner_code.as_str())
        .collect::<HashSet<_>>()
        .len();

    MembershipMetrics {
        total_enrolled: enrolled.len(),
        total_members: members.len(),
        membership_rate: rate(members.len(), enrolled.len()),
        certified_members,
        certified_member_rate: rate(certified_members, members.len()),
        active_communities,
    }
}

// ── Time series ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
}

impl Granularity {
    /// Daily only for explicit windows no longer than the configured cap.
    pub fn for_window(window: &DateWindow, config: &MetricsConfig) -> Self {
        match window.span_days() {
            Some(days) if days <= config.daily_granularity_max_days => Self::Daily,
            _ => Self::Weekly,
        }
    }

    /// Bucket anchor: the UTC day, or the Monday of its ISO week.
    pub fn bucket(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.bucket_day(instant.date_naive())
    }

    pub fn bucket_day(&self, day: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily  => day,
            Self::Weekly => day - Duration::days(day.weekday().num_days_from_monday() as i64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub name: String,
    pub bucket_start: NaiveDate,
    pub registrations: usize,
    pub certifications: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipChartPoint {
    pub name: String,
    pub bucket_start: NaiveDate,
    pub enrollees: usize,
    pub new_members: usize,
}

/// Ordered buckets of two counters, shared by both chart kinds.
struct Timeline {
    granularity: Granularity,
    buckets: BTreeMap<NaiveDate, (usize, usize)>,
}

impl Timeline {
    fn new(window: &DateWindow, config: &MetricsConfig) -> Self {
        let granularity = Granularity::for_window(window, config);
        let mut buckets = BTreeMap::new();
        if let (Some(start), Some(end)) = (window.start, window.end) {
            let (first, last) = (start.date_naive(), end.date_naive());
            for day in first.iter_days().take_while(|d| *d <= last) {
                buckets.entry(granularity.bucket_day(day)).or_insert((0, 0));
            }
        }
        Self { granularity, buckets }
    }

    fn first(&mut self, instant: DateTime<Utc>) {
        self.slot(instant).0 += 1;
    }

    fn second(&mut self, instant: DateTime<Utc>) {
        self.slot(instant).1 += 1;
    }

    fn slot(&mut self, instant: DateTime<Utc>) -> &mut (usize, usize) {
        self.buckets
            .entry(self.granularity.bucket(instant))
            .or_insert((0, 0))
    }

    fn finish(self, window: &DateWindow, config: &MetricsConfig) -> Vec<(NaiveDate, usize, usize)> {
        let all: Vec<_> = self.buckets.into_iter().map(|(d, (a, b))| (d, a, b)).collect();
        if window.is_unbounded() && all.len() > config.undated_bucket_limit {
            all[all.len() - config.undated_bucket_limit..].to_vec()
        } else {
            all
        }
    }
}

fn bucket_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Registrations (by createdAt) and certifications (by completedAt,
/// progress 100) per bucket, ascending.
pub fn generate_chart_data(
    records: &[DeveloperRecord],
    window: &DateWindow,
    config: &MetricsConfig,
) -> Vec<ChartPoint> {
    if records.is_empty() {
        return Vec::new();
    }
    let mut timeline = Timeline::new(window, config);
    for r in records {
        if let Some(created) = r.created_at.filter(|_| window.contains(r.created_at)) {
            timeline.first(created);
        }
        if r.is_certified() {
            if let Some(completed) = r.completed_at.filter(|_| window.contains(r.completed_at)) {
                timeline.second(completed);
            }
        }
    }
    timeline
        .finish(window, config)
        .into_iter()
        .map(|(d, registrations, certifications)| ChartPoint {
            name: bucket_label(d),
            bucket_start: d,
            registrations,
            certifications,
        })
        .collect()
}

/// Enrollees (by createdAt) and, of those, new members per bucket.
pub fn generate_membership_chart_data(
    records: &[DeveloperRecord],
    window: &DateWindow,
    config: &MetricsConfig,
) -> Vec<MembershipChartPoint> {
    if records.is_empty() {
        return Vec::new();
    }
    let mut timeline = Timeline::new(window, config);
    for r in records {
        if let Some(created) = r.created_at.filter(|_| window.contains(r.created_at)) {
            timeline.first(created);
            if r.accepted_membership {
                timeline.second(created);
            }
        }
    }
    timeline
        .finish(window, config)
        .into_iter()
        .map(|(d, enrollees, new_members)| MembershipChartPoint {
            name: bucket_label(d),
            bucket_start: d,
            enrollees,
            new_members,
        })
        .collect()
}

// ── Leaderboard ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub value: usize,
}

/// Certified counts per real community, highest first. Ties order by
/// partner code so output is stable.
pub fn generate_leaderboard(records: &[DeveloperRecord], config: &MetricsConfig) -> Vec<LeaderboardEntry> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in records.iter().filter(|r| r.is_certified() && r.has_community()) {
        *counts.entry(r.partner_code.as_str()).or_insert(0) += 1;
    }
    let mut entries: Vec<LeaderboardEntry> = counts
        .into_iter()
        .map(|(name, value)| LeaderboardEntry { name: name.to_string(), value })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(config.leaderboard_size);
    entries
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// All reporting outputs for one window. Derived, never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub window: DateWindow,
    pub granularity: Granularity,
    pub dashboard: DashboardMetrics,
    pub membership: MembershipMetrics,
    pub chart: Vec<ChartPoint>,
    pub membership_chart: Vec<MembershipChartPoint>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl MetricsSnapshot {
    pub fn compute(records: &[DeveloperRecord], window: DateWindow, config: &MetricsConfig) -> Self {
        Self {
            granularity: Granularity::for_window(&window, config),
            dashboard: calculate_dashboard_metrics(records, &window, config),
            membership: calculate_membership_metrics(records, &window),
            chart: generate_chart_data(records, &window, config),
            membership_chart: generate_membership_chart_data(records, &window, config),
            leaderboard: generate_leaderboard(records, config),
            window,
        }
    }
}
