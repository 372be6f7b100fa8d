#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create database parent {path}: {source}")]
    CreateParent {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite statement failed: {source}")]
    Sql {
        #[source]
        source: rusqlite::Error,
    },
    #[error("report data json failed for report `{report_id}`: {source}")]
    Json {
        report_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("report id `{report_id}` is already taken")]
    ReportIdTaken { report_id: String },
    #[error("report `{report_id}` not found for user `{user_id}`")]
    ReportNotFound { report_id: String, user_id: String },
    #[error("invalid row in `{table}`: {reason}")]
    InvalidRow { table: &'static str, reason: String },
    #[error("failed to allocate a unique {kind} after {attempts} attempts")]
    IdAllocation { kind: &'static str, attempts: u32 },
}
