use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Endpoint list and per-endpoint field sets returned by the classifier.
/// `requested_data[i]` names the fields required by `api_calls[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub api_calls: Vec<String>,
    pub requested_data: Vec<Vec<String>>,
}

impl Classification {
    /// Strict shape check; nothing is coerced.
    pub fn from_response(body: &Value) -> Result<Self, String> {
        let object = body
            .as_object()
            .ok_or_else(|| "response body must be a json object".to_string())?;

        let api_calls = object
            .get("api_calls")
            .ok_or_else(|| "missing `api_calls`".to_string())?
            .as_array()
            .ok_or_else(|| "`api_calls` must be an array".to_string())?
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("`api_calls[{idx}]` must be a string"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let requested_data = object
            .get("requested_data")
            .ok_or_else(|| "missing `requested_data`".to_string())?
            .as_array()
            .ok_or_else(|| "`requested_data` must be an array".to_string())?
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                entry
                    .as_array()
                    .ok_or_else(|| format!("`requested_data[{idx}]` must be an array"))?
                    .iter()
                    .map(|field| {
                        field.as_str().map(str::to_string).ok_or_else(|| {
                            format!("`requested_data[{idx}]` must contain only strings")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        if requested_data.len() != api_calls.len() {
            return Err(format!(
                "`requested_data` has {} entries but `api_calls` has {}",
                requested_data.len(),
                api_calls.len()
            ));
        }

        Ok(Self {
            api_calls,
            requested_data,
        })
    }
}

/// One endpoint invocation in the final analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCallPayload {
    pub endpoint: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub markdown: Option<String>,
    pub raw: Value,
}

impl AnalysisResponse {
    /// A missing, non-string or blank `markdown` means no narrative.
    pub fn from_response(raw: Value) -> Self {
        let markdown = raw
            .get("markdown")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string);
        Self { markdown, raw }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: Option<String>,
}
