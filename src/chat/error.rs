use crate::gateway::GatewayError;
use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message must be non-empty")]
    EmptyMessage,
    #[error("no authenticated user; log in first")]
    NotAuthenticated,
    #[error("report `{report_id}` not found")]
    ReportNotFound { report_id: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
