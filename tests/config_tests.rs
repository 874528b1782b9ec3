//! Configuration loading tests: TOML parsing, defaults, error paths.

use std::io::Write;
use std::time::Duration;

use printwatch::config;

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config::load(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(cfg.capture.slot_section, "DBWIN_BUFFER");
    assert_eq!(cfg.capture.buffer_ready, "DBWIN_BUFFER_READY");
    assert_eq!(cfg.capture.data_ready, "DBWIN_DATA_READY");
    assert!(cfg.capture.kernel);
    assert!(cfg.capture.legacy);
    assert!(!cfg.logging.enable_file);
}

#[test]
fn partial_toml_overrides_only_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("printwatch.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(
        f,
        r#"
[capture]
slot_section = "TEST_SLOT"
wait_timeout = "50ms"
kernel = false

[logging]
level = "debug"
"#
    )
    .unwrap();

    let cfg = config::load(&path).unwrap();
    assert_eq!(cfg.capture.slot_section, "TEST_SLOT");
    assert_eq!(cfg.capture.wait_timeout().unwrap(), Duration::from_millis(50));
    assert!(!cfg.capture.kernel);
    assert!(cfg.capture.legacy); // untouched default
    assert_eq!(cfg.capture.data_ready, "DBWIN_DATA_READY");
    assert_eq!(cfg.logging.level, "debug");

    let names = cfg.capture.slot_names();
    assert_eq!(names.section, "TEST_SLOT");
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("printwatch.toml");
    std::fs::write(&path, "[capture\nbroken").unwrap();
    assert!(matches!(
        config::load(&path),
        Err(config::ConfigError::Toml(_))
    ));
}
