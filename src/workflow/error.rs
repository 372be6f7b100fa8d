use super::state::WorkflowStep;
use crate::gateway::GatewayError;
use crate::persistence::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowErrorKind {
    Validation,
    Remote,
    Schema,
    Persistence,
    Abandoned,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("query must be non-empty")]
    EmptyQuery,
    #[error("no authenticated user; log in first")]
    NotAuthenticated,
    #[error("`{operation}` is not allowed at step {step}")]
    InvalidStep {
        operation: &'static str,
        step: WorkflowStep,
    },
    #[error("`{field}` is not one of the requested form fields")]
    UnknownField { field: String },
    #[error("no report has been created for this workflow yet")]
    ReportNotAssigned,
    #[error("at least one file is required")]
    NoFiles,
    #[error("{count} files given; at most {max} may be uploaded at once")]
    TooManyFiles { count: usize, max: usize },
    #[error("workflow was abandoned; response discarded")]
    Abandoned,
    #[error("failed to allocate report id: {reason}")]
    IdAllocation { reason: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl WorkflowError {
    pub fn kind(&self) -> WorkflowErrorKind {
        match self {
            Self::EmptyQuery
            | Self::NotAuthenticated
            | Self::InvalidStep { .. }
            | Self::UnknownField { .. }
            | Self::ReportNotAssigned
            | Self::NoFiles
            | Self::TooManyFiles { .. } => WorkflowErrorKind::Validation,
            Self::Gateway(err) if err.is_schema() => WorkflowErrorKind::Schema,
            Self::Gateway(_) => WorkflowErrorKind::Remote,
            Self::IdAllocation { .. } | Self::Persistence(_) => WorkflowErrorKind::Persistence,
            Self::Abandoned => WorkflowErrorKind::Abandoned,
        }
    }
}

impl std::fmt::Display for WorkflowErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowErrorKind::Validation => write!(f, "validation"),
            WorkflowErrorKind::Remote => write!(f, "remote"),
            WorkflowErrorKind::Schema => write!(f, "schema"),
            WorkflowErrorKind::Persistence => write!(f, "persistence"),
            WorkflowErrorKind::Abandoned => write!(f, "abandoned"),
        }
    }
}
