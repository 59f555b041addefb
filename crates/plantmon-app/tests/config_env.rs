//! Environment overrides. Kept alone in this binary since it mutates the
//! process environment.

use plantmon_app::AppConfig;

#[test]
fn test_environment_overrides_file_values() {
    let dir = std::env::temp_dir().join(format!("plantmon-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("plantmon.toml");
    std::fs::write(
        &path,
        r#"
        [broker]
        host = "file-host"
        port = 1883
        client_id = "from-file"

        [dashboard]
        port = 9000
        "#,
    )
    .unwrap();

    std::env::set_var("PLANTMON__BROKER__HOST", "env-host");
    std::env::set_var("PLANTMON__BROKER__CLIENT_ID", "from-env");
    std::env::set_var("PLANTMON__DASHBOARD__PORT", "9100");

    let config = AppConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.broker.host, "env-host");
    assert_eq!(config.broker.client_id, "from-env");
    assert_eq!(config.broker.port, 1883);
    assert_eq!(config.dashboard.port, 9100);

    // a missing file falls back to defaults plus environment
    let config = AppConfig::load("/nonexistent/plantmon.toml").unwrap();
    assert_eq!(config.broker.host, "env-host");
    assert_eq!(config.broker.port, 8083);

    std::env::remove_var("PLANTMON__BROKER__HOST");
    std::env::remove_var("PLANTMON__BROKER__CLIENT_ID");
    std::env::remove_var("PLANTMON__DASHBOARD__PORT");
    let _ = std::fs::remove_dir_all(&dir);
}
