use super::{ConfigError, DATABASE_FILE_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CLASSIFY_URL: &str = "http://localhost:5000/add_context";
pub const DEFAULT_ANALYZE_URL: &str = "http://localhost:4001/selected-apis";
pub const DEFAULT_UPLOAD_URL: &str = "http://localhost:5000/upload_pdfs";
pub const DEFAULT_CHAT_URL: &str = "http://localhost:4000/chat";
pub const DEFAULT_AUTH_TOKEN_ENV: &str = "CREDISPHERE_GATEWAY_TOKEN";
pub const DEFAULT_MAX_UPLOAD_FILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Relative paths resolve against the state root.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_classify_url")]
    pub classify_url: String,
    #[serde(default = "default_analyze_url")]
    pub analyze_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_files")]
    pub max_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            gateway: GatewayConfig::default(),
            uploads: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            classify_url: default_classify_url(),
            analyze_url: default_analyze_url(),
            upload_url: default_upload_url(),
            chat_url: default_chat_url(),
            auth_token: None,
            auth_token_env: default_auth_token_env(),
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_upload_files(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// The env var named by `auth_token_env` wins over the inline token.
    pub fn resolve_auth_token(&self) -> Option<String> {
        std::env::var(&self.auth_token_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.auth_token
                    .clone()
                    .filter(|v| !v.trim().is_empty())
            })
    }

    fn endpoints(&self) -> [(&'static str, &str); 4] {
        [
            ("classify_url", self.classify_url.as_str()),
            ("analyze_url", self.analyze_url.as_str()),
            ("upload_url", self.upload_url.as_str()),
            ("chat_url", self.chat_url.as_str()),
        ]
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in self.gateway.endpoints() {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Settings(format!(
                    "`gateway.{key}` must be an http(s) url, got `{url}`"
                )));
            }
        }
        if self.gateway.timeout_ms == 0 {
            return Err(ConfigError::Settings(
                "`gateway.timeout_ms` must be greater than 0".to_string(),
            ));
        }
        if self.gateway.auth_token_env.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`gateway.auth_token_env` must be non-empty".to_string(),
            ));
        }
        if self.uploads.max_files == 0 {
            return Err(ConfigError::Settings(
                "`uploads.max_files` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve_database_path(&self, state_root: &Path) -> PathBuf {
        match self.database_path.as_ref() {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => state_root.join(path),
            None => state_root.join(DATABASE_FILE_NAME),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let body = serde_yaml::to_string(self).map_err(|source| ConfigError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, body).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

fn default_classify_url() -> String {
    DEFAULT_CLASSIFY_URL.to_string()
}

fn default_analyze_url() -> String {
    DEFAULT_ANALYZE_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_chat_url() -> String {
    DEFAULT_CHAT_URL.to_string()
}

fn default_auth_token_env() -> String {
    DEFAULT_AUTH_TOKEN_ENV.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_max_upload_files() -> usize {
    DEFAULT_MAX_UPLOAD_FILES
}

fn default_true() -> bool {
    true
}
