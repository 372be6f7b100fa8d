use super::{default_state_root, settings_path, ConfigError, Settings};
use std::path::{Path, PathBuf};

/// Loads `<state_root>/config.yaml`; a missing file yields validated defaults.
pub fn load_settings(state_root: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path(state_root);
    let settings = if path.exists() {
        Settings::from_path(&path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}

pub fn load_global_settings() -> Result<(PathBuf, Settings), ConfigError> {
    let state_root = default_state_root()?;
    let settings = load_settings(&state_root)?;
    Ok((state_root, settings))
}
