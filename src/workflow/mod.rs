pub mod controller;
pub mod error;
pub mod state;

pub use controller::{AbandonHandle, AnalysisOutcome, QueryOutcome, ReportWorkflow, UploadOutcome};
pub use error::{WorkflowError, WorkflowErrorKind};
pub use state::{build_api_call_payloads, derive_form_fields, WorkflowState, WorkflowStep};
