//! Loading configuration files from disk

use backoffice::config::BackendKind;
use backoffice::core::error::ConfigError;
use backoffice::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_memory_config_from_file() {
    let file = write_config(
        r#"
backend: memory
server:
  port: 8080
auth:
  admin_role: admin
  static_tokens:
    - token: dev-token
      user_id: 6f1c1b9e-2f1a-4a57-9b36-0d2a3c4e5f60
      roles: [admin]
billing:
  default_interval_days: 15
"#,
    );

    let config = assert_ok!(AppConfig::from_yaml_file(file.path().to_str().unwrap()));
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.billing.default_interval_days, 15);
    assert_eq!(config.auth.static_tokens.len(), 1);
    assert!(config.auth.static_tokens[0].context().has_role("admin"));
    assert_ok!(config.validate());
}

#[test]
fn test_env_overrides_file_values() {
    let file = write_config("backend: memory\nserver:\n  port: 8080\n");
    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap())
        .unwrap()
        .with_env(|key| match key {
            "PORT" => Some("9090".to_string()),
            "VITE_SUPABASE_URL" => Some("https://project.supabase.co".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(
        config.supabase.url.as_deref(),
        Some("https://project.supabase.co")
    );
}

#[test]
fn test_supabase_backend_needs_a_key() {
    let file = write_config("backend: supabase\nsupabase:\n  url: https://project.supabase.co\n");
    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    let err = assert_err!(config.validate());
    assert!(matches!(err, ConfigError::Missing { .. }));
}

#[test]
fn test_parse_error_names_the_file() {
    let file = write_config("server: [not, a, map");
    let path = file.path().to_str().unwrap().to_string();
    match AppConfig::from_yaml_file(&path) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::from_yaml_file(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_memory_server_builds_from_file() {
    let file = write_config("backend: memory\n");
    let config = AppConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_ok!(ServerBuilder::new().with_config(config).build_host());
}
