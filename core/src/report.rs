//! Period-over-period community reporting.

use crate::{
    config::MetricsConfig,
    metrics::{calculate_dashboard_metrics, DashboardMetrics, DateWindow},
    record::DeveloperRecord,
};
use serde::{Deserialize, Serialize};

/// One metric in the current and previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    /// `None` when the previous value is zero.
    pub change_pct: Option<f64>,
}

impl MetricDelta {
    pub fn new(current: f64, previous: f64) -> Self {
        let change = current - previous;
        let change_pct = (previous != 0.0).then(|| change / previous * 100.0);
        Self { current, previous, change, change_pct }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDeltas {
    pub total_registered: MetricDelta,
    pub total_certified: MetricDelta,
    pub certification_rate: MetricDelta,
    pub avg_completion_time_days: MetricDelta,
    pub potential_fake_accounts: MetricDelta,
}

impl ReportDeltas {
    pub fn between(current: &DashboardMetrics, previous: &DashboardMetrics) -> Self {
        Self {
            total_registered: MetricDelta::new(
                current.total_registered as f64,
                previous.total_registered as f64,
            ),
            total_certified: MetricDelta::new(
                current.total_certified as f64,
                previous.total_certified as f64,
            ),
            certification_rate: MetricDelta::new(current.certification_rate, previous.certification_rate),
            avg_completion_time_days: MetricDelta::new(
                current.avg_completion_time_days,
                previous.avg_completion_time_days,
            ),
            potential_fake_accounts: MetricDelta::new(
                current.potential_fake_accounts as f64,
                previous.potential_fake_accounts as f64,
            ),
        }
    }
}

/// Community metrics for a window, the same community one period
/// earlier, and the whole dataset as benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingContext {
    pub community: String,
    pub window: DateWindow,
    pub previous_window: DateWindow,
    pub current: DashboardMetrics,
    pub previous: DashboardMetrics,
    pub global: DashboardMetrics,
    pub deltas: ReportDeltas,
}

/// Build the comparative report. Requires a fully bounded window;
/// returns `None` otherwise.
pub fn comparative_report(
    records: &[DeveloperRecord],
    community: &str,
    window: DateWindow,
    config: &MetricsConfig,
) -> Option<ReportingContext> {
    let previous_window = window.previous_period()?;
    let scoped: Vec<DeveloperRecord> = records
        .iter()
        .filter(|r| r.partner_code == community)
        .cloned()
        .collect();

    let current = calculate_dashboard_metrics(&scoped, &window, config);
    let previous = calculate_dashboard_metrics(&scoped, &previous_window, config);
    let global = calculate_dashboard_metrics(records, &window, config);
    let deltas = ReportDeltas::between(&current, &previous);

    Some(ReportingContext {
        community: community.to_string(),
        window,
        previous_window,
        current,
        previous,
        global,
        deltas,
    })
}
