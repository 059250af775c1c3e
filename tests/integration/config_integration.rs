//! Integration tests for Configuration System

use node_attrs::logging::{LogFormat, LogOutput};
use node_attrs::{path, AttributesConfig, ConfigLoader, NodeAttributes, TraceMode};
use tempfile::TempDir;

#[test]
fn test_trace_mode_from_config_file_drives_tracer() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("attrs.toml");

    std::fs::write(
        &config_file,
        r#"
trace_attributes = "/nginx"

[logging]
level = "info"
format = "json"
output = "stdout"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(config.trace_attributes, TraceMode::Path("/nginx".to_string()));
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.output, LogOutput::Stdout);

    let mut attrs = NodeAttributes::from_config(&config);
    attrs.default_mut().write(path!["nginx", "port"], 80);
    attrs.default_mut().write(path!["ntp"], "pool");

    let log = attrs.trace_log();
    assert!(log.contains_key("/nginx/port"));
    assert!(!log.contains_key("/ntp"));
}

#[test]
fn test_workspace_config_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "trace_attributes = \"all\"\n").unwrap();

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    assert_eq!(config.trace_attributes, TraceMode::All);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_trace_mode_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("attrs.toml");
    std::fs::write(&config_file, "trace_attributes = \"sometimes\"\n").unwrap();
    assert!(ConfigLoader::load_from_file(&config_file).is_err());
}

#[test]
fn test_default_config_disables_tracing() {
    let attrs = NodeAttributes::from_config(&AttributesConfig::default());
    assert_eq!(attrs.trace_mode(), &TraceMode::None);
}
