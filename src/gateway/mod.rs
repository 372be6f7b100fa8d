pub mod client;
pub mod error;
pub mod multipart;
pub mod types;

pub use client::HttpGateway;
pub use error::GatewayError;
pub use types::{
    AnalysisResponse, ApiCallPayload, ChatReply, Classification, UploadFile, UploadReceipt,
};

use crate::shared::ReportId;

/// External classification/analysis service. Each call is an independent
/// JSON request/response exchange.
pub trait AnalysisGateway {
    fn classify(&self, context: &str, report_id: &ReportId)
        -> Result<Classification, GatewayError>;

    fn analyze(
        &self,
        calls: &[ApiCallPayload],
        report_id: &ReportId,
    ) -> Result<AnalysisResponse, GatewayError>;

    fn upload(&self, files: &[UploadFile], report_id: &ReportId)
        -> Result<UploadReceipt, GatewayError>;

    fn chat(&self, report_id: &ReportId, message: &str) -> Result<ChatReply, GatewayError>;
}

impl<T: AnalysisGateway + ?Sized> AnalysisGateway for &T {
    fn classify(
        &self,
        context: &str,
        report_id: &ReportId,
    ) -> Result<Classification, GatewayError> {
        (**self).classify(context, report_id)
    }

    fn analyze(
        &self,
        calls: &[ApiCallPayload],
        report_id: &ReportId,
    ) -> Result<AnalysisResponse, GatewayError> {
        (**self).analyze(calls, report_id)
    }

    fn upload(
        &self,
        files: &[UploadFile],
        report_id: &ReportId,
    ) -> Result<UploadReceipt, GatewayError> {
        (**self).upload(files, report_id)
    }

    fn chat(&self, report_id: &ReportId, message: &str) -> Result<ChatReply, GatewayError> {
        (**self).chat(report_id, message)
    }
}
