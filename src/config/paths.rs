use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".credisphere";
pub const SETTINGS_FILE_NAME: &str = "config.yaml";
pub const DATABASE_FILE_NAME: &str = "credisphere.db";
pub const SESSION_FILE_NAME: &str = "session.json";
pub const STATE_ROOT_ENV: &str = "CREDISPHERE_HOME";

/// `$CREDISPHERE_HOME` when set, otherwise `$HOME/.credisphere`.
pub fn default_state_root() -> Result<PathBuf, ConfigError> {
    if let Some(root) = std::env::var_os(STATE_ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(GLOBAL_STATE_DIR))
}

pub fn settings_path(state_root: &Path) -> PathBuf {
    state_root.join(SETTINGS_FILE_NAME)
}

pub fn session_path(state_root: &Path) -> PathBuf {
    state_root.join(SESSION_FILE_NAME)
}
