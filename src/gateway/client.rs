use super::error::GatewayError;
use super::multipart::MultipartForm;
use super::types::{
    AnalysisResponse, ApiCallPayload, ChatReply, Classification, UploadFile, UploadReceipt,
};
use super::AnalysisGateway;
use crate::config::GatewayConfig;
use crate::shared::ReportId;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;

/// Blocking HTTP client for the classification, analysis, upload and chat
/// endpoints. Timeout and retry policy come from [`GatewayConfig`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    agent: ureq::Agent,
    classify_url: String,
    analyze_url: String,
    upload_url: String,
    chat_url: String,
    auth_token: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        Self {
            agent,
            classify_url: config.classify_url.trim().to_string(),
            analyze_url: config.analyze_url.trim().to_string(),
            upload_url: config.upload_url.trim().to_string(),
            chat_url: config.chat_url.trim().to_string(),
            auth_token: config.resolve_auth_token(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }

    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token;
        self
    }

    fn request(&self, url: &str) -> ureq::Request {
        let request = self.agent.post(url);
        match self.auth_token.as_deref() {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        let response = self.send_with_retries(url, || {
            self.request(url)
                .set("Content-Type", "application/json")
                .send_json(body)
        })?;
        response
            .into_json::<Value>()
            .map_err(|err| GatewayError::Schema {
                url: url.to_string(),
                reason: format!("response body is not valid json: {err}"),
            })
    }

    /// Retries transport failures only; a status response is final.
    fn send_with_retries<F>(&self, url: &str, mut send: F) -> Result<ureq::Response, GatewayError>
    where
        F: FnMut() -> Result<ureq::Response, ureq::Error>,
    {
        let mut attempt = 0_u32;
        loop {
            match send() {
                Ok(response) => return Ok(response),
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(GatewayError::Status {
                        url: url.to_string(),
                        status,
                        body,
                    });
                }
                Err(ureq::Error::Transport(transport)) => {
                    if attempt >= self.max_retries {
                        return Err(GatewayError::Transport {
                            url: url.to_string(),
                            reason: transport.to_string(),
                        });
                    }
                    attempt += 1;
                    thread::sleep(self.retry_backoff.saturating_mul(attempt));
                }
            }
        }
    }
}

impl AnalysisGateway for HttpGateway {
    fn classify(
        &self,
        context: &str,
        report_id: &ReportId,
    ) -> Result<Classification, GatewayError> {
        let body = json!({
            "context": context,
            "report_id": report_id.as_str(),
        });
        let response = self.post_json(&self.classify_url, &body)?;
        Classification::from_response(&response).map_err(|reason| GatewayError::Schema {
            url: self.classify_url.clone(),
            reason,
        })
    }

    fn analyze(
        &self,
        calls: &[ApiCallPayload],
        report_id: &ReportId,
    ) -> Result<AnalysisResponse, GatewayError> {
        let body = json!({
            "api_calls": calls,
            "report_id": report_id.as_str(),
        });
        let response = self.post_json(&self.analyze_url, &body)?;
        Ok(AnalysisResponse::from_response(response))
    }

    fn upload(
        &self,
        files: &[UploadFile],
        report_id: &ReportId,
    ) -> Result<UploadReceipt, GatewayError> {
        let mut form = MultipartForm::new().map_err(|reason| GatewayError::Encode {
            url: self.upload_url.clone(),
            reason,
        })?;
        form.text("report_id", report_id.as_str());
        for file in files {
            form.file("files", &file.file_name, &file.content_type, &file.bytes);
        }
        let (content_type, body) = form.finish();

        let response = self.send_with_retries(&self.upload_url, || {
            self.request(&self.upload_url)
                .set("Content-Type", &content_type)
                .send_bytes(&body)
        })?;
        let text = response
            .into_string()
            .map_err(|err| GatewayError::Schema {
                url: self.upload_url.clone(),
                reason: format!("failed to read response body: {err}"),
            })?;
        let raw = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(UploadReceipt { raw })
    }

    fn chat(&self, report_id: &ReportId, message: &str) -> Result<ChatReply, GatewayError> {
        let body = json!({
            "report_id": report_id.as_str(),
            "message": message,
        });
        let response = self.post_json(&self.chat_url, &body)?;
        let reply = response
            .get("response")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string);
        Ok(ChatReply { response: reply })
    }
}
