//! Configuration file tests

use std::path::PathBuf;

use ontoloom_runtime::OntoloomConfig;

#[test]
fn reads_a_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ontoloom.toml");
    std::fs::write(
        &path,
        r#"
schema = "network.xml"

[blobs]
dir = "schemas"

[retry]
max_attempts = 1
backoff_ms = 0

[log]
filter = "ontoloom_storage=debug"
json = true
"#,
    )
    .unwrap();
    let config = OntoloomConfig::from_file(&path).unwrap();
    assert_eq!(config.schema.as_deref(), Some("network.xml"));
    assert_eq!(config.blobs.dir, PathBuf::from("schemas"));
    assert_eq!(config.store.file, None);
    assert_eq!(config.retry.policy().max_attempts, 1);
    assert!(config.log.json);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = OntoloomConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.kind.category(), "IoError");
}

#[test]
fn bad_toml_is_a_config_error() {
    let err = OntoloomConfig::from_toml("schema = [").unwrap_err();
    assert_eq!(err.kind.category(), "ConfigError");
}
