use crate::persistence::ReportSummary;
use chrono::{DateTime, NaiveDate};

/// Criteria for the report history listing. Dates are interpreted in UTC;
/// both bounds are inclusive of the whole day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportHistoryFilter {
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportHistoryFilter {
    pub fn with_search(mut self, search: &str) -> Self {
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_string());
        self
    }

    pub fn with_from(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn matches(&self, report: &ReportSummary) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_ascii_lowercase();
            if !report
                .report_id
                .as_str()
                .to_ascii_lowercase()
                .contains(&needle)
            {
                return false;
            }
        }
        if let Some(from) = self.from {
            if report.created_at < day_start(from) {
                return false;
            }
        }
        if let Some(to) = self.to {
            // Exclusive bound at the start of the following day.
            match to.succ_opt() {
                Some(next) if report.created_at >= day_start(next) => return false,
                _ => {}
            }
        }
        true
    }
}

pub fn parse_filter_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{raw}` (expected YYYY-MM-DD): {err}"))
}

/// Applies `filter` without disturbing the newest-first order of `reports`.
pub fn filter_reports(reports: &[ReportSummary], filter: &ReportHistoryFilter) -> Vec<ReportSummary> {
    reports
        .iter()
        .filter(|report| filter.matches(report))
        .cloned()
        .collect()
}

pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|at| at.and_utc().timestamp())
        .unwrap_or(i64::MIN)
}
