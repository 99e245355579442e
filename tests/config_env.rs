// tests/config_env.rs
use startup_revenue_tracker::config::{
    TrackerConfig, ENV_CONFIG_PATH, ENV_THRESHOLD,
};

#[serial_test::serial]
#[test]
fn env_threshold_overrides_file_and_defaults() {
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::set_var(ENV_THRESHOLD, "55.5");

    let cfg = TrackerConfig::load_default().unwrap();
    assert!((cfg.threshold_millions - 55.5).abs() < 1e-9);

    std::env::remove_var(ENV_THRESHOLD);
}

#[serial_test::serial]
#[test]
fn config_file_via_env_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.toml");
    std::fs::write(
        &path,
        r#"
        threshold_millions = 100.0
        context_window_tokens = 9
        "#,
    )
    .unwrap();

    std::env::remove_var(ENV_THRESHOLD);
    std::env::set_var(ENV_CONFIG_PATH, path.display().to_string());

    let cfg = TrackerConfig::load_default().unwrap();
    assert!((cfg.threshold_millions - 100.0).abs() < 1e-9);
    assert_eq!(cfg.context_window_tokens, 9);
    // Unspecified fields keep their defaults.
    assert_eq!(cfg.retention_days, 180);

    std::env::remove_var(ENV_CONFIG_PATH);
}

#[serial_test::serial]
#[test]
fn missing_env_path_falls_back_to_defaults() {
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_THRESHOLD);
    let cfg = TrackerConfig::load_default().unwrap();
    cfg.validate().unwrap();
}

#[serial_test::serial]
#[test]
fn broken_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.toml");
    std::fs::write(&path, "threshold_millions = \"not a number\"").unwrap();
    std::env::set_var(ENV_CONFIG_PATH, path.display().to_string());

    assert!(TrackerConfig::load_default().is_err());

    std::env::remove_var(ENV_CONFIG_PATH);
}
