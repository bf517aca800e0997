use quiesce::Settings;
use std::env;
use tempfile::TempDir;

#[test]
fn env_overrides_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(&config_path, "[dispatch]\ndelay_ms = 250\n").unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.dispatch.delay_ms, 250);

    unsafe {
        // Double underscore separates nested levels
        env::set_var("QS_DISPATCH__DELAY_MS", "500");
    }

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(
        settings.dispatch.delay_ms, 500,
        "env var should override the config file"
    );

    unsafe {
        env::remove_var("QS_DISPATCH__DELAY_MS");
    }
}

#[test]
fn save_and_reload_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".quiesce").join("settings.toml");

    let mut settings = Settings::default();
    settings.dispatch.delay_ms = 450;
    settings
        .logging
        .modules
        .insert("dispatch".to_string(), "debug".to_string());
    settings.save(&config_path).unwrap();

    let loaded = Settings::load_from(&config_path).unwrap();
    assert_eq!(loaded.dispatch.delay_ms, 450);
    assert_eq!(
        loaded.logging.modules.get("dispatch").map(String::as_str),
        Some("debug")
    );
}
