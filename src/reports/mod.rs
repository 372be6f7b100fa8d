pub mod history;
pub mod view;

pub use history::{filter_reports, format_timestamp, parse_filter_date, ReportHistoryFilter};
pub use view::{render_chat_message, render_report, render_summary, NO_ANALYSIS_TEXT};
