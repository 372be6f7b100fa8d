use super::history::format_timestamp;
use crate::persistence::{ChatMessage, Report, ReportSummary};

pub const NO_ANALYSIS_TEXT: &str = "No analysis results available";

pub fn render_summary(report: &ReportSummary) -> String {
    format!(
        "{}  {}",
        report.report_id,
        format_timestamp(report.created_at)
    )
}

/// Plain-text rendering of a stored report: the original query followed by
/// the narrative, or a placeholder when none was stored. A non-empty blob is
/// appended as pretty-printed JSON.
pub fn render_report(report: &Report) -> String {
    let mut out = vec![
        format!("Report {}", report.report_id),
        format!("Created: {}", format_timestamp(report.created_at)),
        String::new(),
        "Query:".to_string(),
        report.initial_context.clone(),
        String::new(),
        "Analysis:".to_string(),
    ];
    match report
        .text_paragraph_markdown
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        Some(markdown) => out.push(markdown.to_string()),
        None => out.push(NO_ANALYSIS_TEXT.to_string()),
    }

    if let Some(uploads) = report.other_json_data.as_ref().and_then(|data| data.uploads()) {
        if !uploads.files.is_empty() {
            out.push(String::new());
            out.push("Supporting files:".to_string());
            for file in uploads.files {
                out.push(format!("- {} ({} bytes)", file.file_name, file.size_bytes));
            }
        }
    }

    if let Some(data) = report
        .other_json_data
        .as_ref()
        .filter(|data| !data.as_map().is_empty())
    {
        if let Ok(pretty) = serde_json::to_string_pretty(data.as_map()) {
            out.push(String::new());
            out.push("Data:".to_string());
            out.push(pretty);
        }
    }
    out.join("\n")
}

pub fn render_chat_message(message: &ChatMessage) -> String {
    let speaker = if message.is_user { "you" } else { "assistant" };
    format!("{speaker}: {}", message.content)
}
