//! Reporting timeframe presets resolved against the processing clock.

use crate::metrics::{end_of_day, start_of_day, DateWindow};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timeframe {
    AllTime,
    Last30Days,
    Last90Days,
    ThisYear,
    /// One calendar month (monthly community report).
    Month { year: i32, month: u32 },
    /// Either end may be open.
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl Timeframe {
    /// Resolve to an instant window with whole-day bounds.
    /// `None` only for an impossible month.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateWindow> {
        let today = now.date_naive();
        let window = match *self {
            Self::AllTime    => DateWindow::all_time(),
            Self::Last30Days => DateWindow::days(today - Duration::days(30), today),
            Self::Last90Days => DateWindow::days(today - Duration::days(90), today),
            Self::ThisYear   => DateWindow::days(NaiveDate::from_ymd_opt(today.year(), 1, 1)?, today),
            Self::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                DateWindow::days(first, next - Duration::days(1))
            }
            Self::Custom { start, end } => DateWindow {
                start: start.map(start_of_day),
                end: end.map(end_of_day),
            },
        };
        Some(window)
    }

    /// Parse a CLI spelling: `all`, `30d`, `90d`, `ytd`, `YYYY-MM`, or
    /// `YYYY-MM-DD..YYYY-MM-DD` (either side may be empty).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "all" | "all-time" => return Some(Self::AllTime),
            "30d"              => return Some(Self::Last30Days),
            "90d"              => return Some(Self::Last90Days),
            "ytd" | "year"     => return Some(Self::ThisYear),
            _ => {}
        }
        if let Some((a, b)) = s.split_once("..") {
            let date = |t: &str| -> Option<Option<NaiveDate>> {
                let t = t.trim();
                if t.is_empty() {
                    Some(None)
                } else {
                    NaiveDate::parse_from_str(t, "%Y-%m-%d").ok().map(Some)
                }
            };
            return Some(Self::Custom { start: date(a)?, end: date(b)? });
        }
        let (y, m) = s.split_once('-')?;
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Self::Month { year, month })
    }
}
