//! Executive-summary collaborator contract.
//!
//! Text generation lives outside the core. The core builds the prompt
//! from a metrics snapshot and degrades to fixed text when the
//! collaborator is absent or fails.

use crate::metrics::DashboardMetrics;

pub const SUMMARY_UNAVAILABLE: &str = "Insights unavailable: no summarizer configured.";
pub const SUMMARY_FAILED: &str = "Unable to generate insight. Check the summarizer configuration.";

pub trait Summarizer {
    fn summarize(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Prompt text for one dashboard context (`"Global"` or a partner code).
pub fn build_prompt(metrics: &DashboardMetrics, context: &str) -> String {
    let scope = if context.eq_ignore_ascii_case("all") || context.eq_ignore_ascii_case("global") {
        "Global overview (all regions)".to_string()
    } else {
        format!("Community {context}")
    };
    format!(
        "Write an executive summary of at most three sentences for the developer \
         certification program.\n\
         Scope: {scope}\n\
         Registered developers: {}\n\
         Certified developers: {}\n\
         Certification rate: {:.1}%\n\
         Average completion time: {:.1} days\n\
         Suspicious accounts: {}\n\
         Active communities: {}\n\
         Call out red flags such as high fraud, low completion or zero certifications.",
        metrics.total_registered,
        metrics.total_certified,
        metrics.certification_rate,
        metrics.avg_completion_time_days,
        metrics.potential_fake_accounts,
        metrics.active_communities,
    )
}

pub fn executive_summary(
    summarizer: Option<&dyn Summarizer>,
    metrics: &DashboardMetrics,
    context: &str,
) -> String {
    let Some(summarizer) = summarizer else {
        return SUMMARY_UNAVAILABLE.to_string();
    };
    match summarizer.summarize(&build_prompt(metrics, context)) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => "Analysis complete.".to_string(),
        Err(e) => {
            log::warn!("Summarizer failed for context '{context}': {e}");
            SUMMARY_FAILED.to_string()
        }
    }
}
