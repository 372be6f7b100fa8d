use crate::config::{default_state_root, settings_path, Settings};
use crate::persistence::ReportRepository;
use crate::shared::EventLog;

pub fn cmd_setup() -> Result<String, String> {
    let state_root = default_state_root().map_err(|e| e.to_string())?;
    let config_path = settings_path(&state_root);
    let settings = if config_path.exists() {
        let existing = Settings::from_path(&config_path).map_err(|e| e.to_string())?;
        existing.validate().map_err(|e| e.to_string())?;
        existing
    } else {
        let defaults = Settings::default();
        defaults.save_to(&config_path).map_err(|e| e.to_string())?;
        defaults
    };

    let database_path = settings.resolve_database_path(&state_root);
    let repository = ReportRepository::open(&database_path).map_err(|e| e.to_string())?;
    repository.ensure_schema().map_err(|e| e.to_string())?;
    EventLog::for_state_root(&state_root).info(
        "setup.complete",
        &format!("state root {}", state_root.display()),
    );

    Ok(format!(
        "setup complete\nstate_root={}\nconfig={}\ndatabase={}",
        state_root.display(),
        config_path.display(),
        database_path.display()
    ))
}
