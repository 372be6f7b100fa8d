pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_global_settings, load_settings};
pub use paths::{
    default_state_root, session_path, settings_path, DATABASE_FILE_NAME, GLOBAL_STATE_DIR,
    SESSION_FILE_NAME, SETTINGS_FILE_NAME, STATE_ROOT_ENV,
};
pub use settings::{GatewayConfig, LoggingConfig, Settings, UploadConfig};
