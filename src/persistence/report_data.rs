use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CLASSIFICATION_KEY: &str = "classification";
pub const USER_INPUTS_KEY: &str = "user_inputs";
pub const GATEWAY_RESPONSE_KEY: &str = "gateway_response";
pub const UPLOADS_KEY: &str = "uploads";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationData {
    pub api_calls: Vec<String>,
    pub requested_data: Vec<Vec<String>>,
    pub form_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInputsData {
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponseData {
    pub markdown_present: bool,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFileRecord {
    pub file_name: String,
    pub size_bytes: u64,
    pub uploaded_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadsData {
    pub files: Vec<UploadedFileRecord>,
}

/// One typed piece of the structured report blob, stored under its own
/// top-level key.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportDataSection {
    Classification(ClassificationData),
    UserInputs(UserInputsData),
    GatewayResponse(GatewayResponseData),
    Uploads(UploadsData),
}

impl ReportDataSection {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Classification(_) => CLASSIFICATION_KEY,
            Self::UserInputs(_) => USER_INPUTS_KEY,
            Self::GatewayResponse(_) => GATEWAY_RESPONSE_KEY,
            Self::Uploads(_) => UPLOADS_KEY,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Classification(data) => serde_json::to_value(data),
            Self::UserInputs(data) => serde_json::to_value(data),
            Self::GatewayResponse(data) => serde_json::to_value(data),
            Self::Uploads(data) => serde_json::to_value(data),
        }
    }
}

/// Structured blob attached to a report. Keys that this crate does not know
/// about are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportData(Map<String, Value>);

impl ReportData {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: keys in `patch` replace same-named keys, every other
    /// stored key survives.
    pub fn merge_object(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    /// Uploads accumulate; every other section replaces its previous value.
    pub fn apply_section(&mut self, section: ReportDataSection) -> Result<(), serde_json::Error> {
        let section = match section {
            ReportDataSection::Uploads(mut incoming) => {
                let mut merged = self.uploads().unwrap_or_default();
                merged.files.append(&mut incoming.files);
                ReportDataSection::Uploads(merged)
            }
            other => other,
        };
        let mut patch = Map::new();
        patch.insert(section.key().to_string(), section.to_value()?);
        self.merge_object(patch);
        Ok(())
    }

    pub fn classification(&self) -> Option<ClassificationData> {
        self.section(CLASSIFICATION_KEY)
    }

    pub fn user_inputs(&self) -> Option<UserInputsData> {
        self.section(USER_INPUTS_KEY)
    }

    pub fn gateway_response(&self) -> Option<GatewayResponseData> {
        self.section(GATEWAY_RESPONSE_KEY)
    }

    pub fn uploads(&self) -> Option<UploadsData> {
        self.section(UPLOADS_KEY)
    }

    fn section<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
