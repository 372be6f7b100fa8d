use super::report_data::{ReportData, ReportDataSection};
use crate::shared::{MessageId, ReportId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub organization_name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub report_id: ReportId,
    pub user_id: UserId,
    pub initial_context: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub report_id: ReportId,
    pub user_id: UserId,
    pub initial_context: String,
    pub text_paragraph_markdown: Option<String>,
    pub other_json_data: Option<ReportData>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub report_id: ReportId,
    pub created_at: i64,
}

/// A merge patch for a stored report. `markdown: None` keeps the stored
/// narrative; sections are merged into the blob key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportUpdate {
    pub markdown: Option<String>,
    pub sections: Vec<ReportDataSection>,
}

impl ReportUpdate {
    pub fn section(section: ReportDataSection) -> Self {
        Self {
            markdown: None,
            sections: vec![section],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub report_id: ReportId,
    pub user_id: UserId,
    pub content: String,
    pub is_user: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub report_id: ReportId,
    pub user_id: UserId,
    pub content: String,
    pub is_user: bool,
    pub timestamp: i64,
}
