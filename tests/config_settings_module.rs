use credisphere::config::{
    default_state_root, load_settings, settings_path, ConfigError, Settings, STATE_ROOT_ENV,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings(dir.path()).expect("defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(
        settings.gateway.classify_url,
        "http://localhost:5000/add_context"
    );
    assert_eq!(settings.gateway.timeout(), Duration::from_secs(30));
    assert_eq!(settings.gateway.max_retries, 0);
    assert_eq!(settings.uploads.max_files, 10);
    assert!(settings.logging.enabled);
}

#[test]
fn partial_yaml_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        settings_path(dir.path()),
        "gateway:\n  chat_url: https://chat.example.com/chat\n  max_retries: 2\nuploads:\n  max_files: 4\n",
    )
    .expect("write config");

    let settings = load_settings(dir.path()).expect("load");
    assert_eq!(settings.gateway.chat_url, "https://chat.example.com/chat");
    assert_eq!(settings.gateway.max_retries, 2);
    assert_eq!(settings.gateway.retry_backoff(), Duration::from_millis(250));
    assert_eq!(settings.uploads.max_files, 4);
    assert_eq!(
        settings.gateway.analyze_url,
        "http://localhost:4001/selected-apis"
    );
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        settings_path(dir.path()),
        "gateway:\n  classify_url: ftp://nope\n",
    )
    .expect("write config");
    let err = load_settings(dir.path()).expect_err("bad url");
    assert!(err.to_string().contains("gateway.classify_url"));

    fs::write(settings_path(dir.path()), "uploads:\n  max_files: 0\n").expect("write");
    assert!(matches!(
        load_settings(dir.path()),
        Err(ConfigError::Settings(_))
    ));

    fs::write(settings_path(dir.path()), "gateway: [\n").expect("write");
    assert!(matches!(
        load_settings(dir.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn saved_settings_reload_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default();
    settings.database_path = Some(PathBuf::from("data/reports.db"));
    settings.gateway.timeout_ms = 1_500;
    settings.logging.enabled = false;

    settings
        .save_to(&settings_path(dir.path()))
        .expect("save settings");
    assert_eq!(load_settings(dir.path()).expect("reload"), settings);
}

#[test]
fn state_root_env_overrides_home() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    let dir = tempfile::tempdir().expect("tempdir");
    std::env::set_var(STATE_ROOT_ENV, dir.path());
    let resolved = default_state_root().expect("state root");
    std::env::remove_var(STATE_ROOT_ENV);
    assert_eq!(resolved, dir.path());

    let previous_home = std::env::var_os("HOME");
    std::env::set_var("HOME", dir.path());
    let fallback = default_state_root().expect("home fallback");
    match previous_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }
    assert_eq!(fallback, dir.path().join(".credisphere"));
}

#[test]
fn auth_token_prefers_env_over_inline_value() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    let mut settings = Settings::default();
    settings.gateway.auth_token_env = "CREDISPHERE_CONFIG_TEST_TOKEN".to_string();
    settings.gateway.auth_token = Some("inline".to_string());

    std::env::remove_var("CREDISPHERE_CONFIG_TEST_TOKEN");
    assert_eq!(
        settings.gateway.resolve_auth_token().as_deref(),
        Some("inline")
    );

    std::env::set_var("CREDISPHERE_CONFIG_TEST_TOKEN", "from-env");
    let resolved = settings.gateway.resolve_auth_token();
    std::env::remove_var("CREDISPHERE_CONFIG_TEST_TOKEN");
    assert_eq!(resolved.as_deref(), Some("from-env"));
}
