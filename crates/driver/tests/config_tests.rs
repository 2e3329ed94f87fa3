use driver::DriverConfig;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_parse_partial_config() {
    let config: DriverConfig = toml::from_str(
        r#"
        [logging]
        level = "debug"

        [magtek]
        buffer_sizes = [60]
        "#,
    )
    .unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.magtek.buffer_sizes, vec![60]);
    // Unlisted keys keep their defaults
    assert_eq!(config.magtek.default_sn_length, 7);
    assert!(!config.magtek.validate_negotiation);
    assert_eq!(config.transfer.timeout(), Duration::from_secs(5));
    assert_eq!(config.idtech.max_response_len, 1024);
}

#[test]
fn test_empty_file_is_default() {
    let config: DriverConfig = toml::from_str("").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.idtech.settle(), Duration::from_secs(1));
}

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("driver.toml");

    let mut config = DriverConfig::default();
    config.magtek.reset_settle_ms = 250;
    config.idtech.settle_ms = 10;
    config.save(&path).unwrap();

    let loaded = DriverConfig::load(Some(path)).unwrap();
    assert_eq!(loaded.magtek.reset_settle(), Duration::from_millis(250));
    assert_eq!(loaded.idtech.settle(), Duration::from_millis(10));
}

#[test]
fn test_load_rejects_invalid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("driver.toml");
    std::fs::write(&path, "[idtech]\nchunk_size = 0\n").unwrap();

    assert!(DriverConfig::load(Some(path)).is_err());
}

#[test]
fn test_load_rejects_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("driver.toml");
    std::fs::write(&path, "[magtek\nbuffer_sizes = ").unwrap();

    let err = DriverConfig::load(Some(path)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(DriverConfig::load(Some(dir.path().join("absent.toml"))).is_err());
}
