//! Project root resolution and config file loading
//!
//! Tests that manipulate TGSYNC_PROJECT are marked with #[serial] so they
//! never race each other on the process environment.

use std::env;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;
use tgsync_common::config::{TomlConfig, PROJECT_ENV_VAR};

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(PROJECT_ENV_VAR, "/tmp/tgsync-env-project");
    let config = TomlConfig {
        project_root: Some(PathBuf::from("/tmp/tgsync-toml-project")),
        ..Default::default()
    };

    let root = config
        .resolve_project_root(Some(Path::new("/tmp/tgsync-cli-project")))
        .unwrap();
    assert_eq!(root, PathBuf::from("/tmp/tgsync-cli-project"));

    env::remove_var(PROJECT_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(PROJECT_ENV_VAR, "/tmp/tgsync-env-project");
    let config = TomlConfig {
        project_root: Some(PathBuf::from("/tmp/tgsync-toml-project")),
        ..Default::default()
    };

    let root = config.resolve_project_root(None).unwrap();
    assert_eq!(root, PathBuf::from("/tmp/tgsync-env-project"));

    env::remove_var(PROJECT_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_then_current_dir() {
    env::remove_var(PROJECT_ENV_VAR);
    let config = TomlConfig {
        project_root: Some(PathBuf::from("/tmp/tgsync-toml-project")),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_project_root(None).unwrap(),
        PathBuf::from("/tmp/tgsync-toml-project")
    );

    let fallback = TomlConfig::default().resolve_project_root(None).unwrap();
    assert_eq!(fallback, env::current_dir().unwrap());
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[praat]
binary = "/opt/praat/praat"
prefs_dir = "/home/user/.praat-dir"

[events]
capacity = 32

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load_from(&path).unwrap();
    assert_eq!(config.praat.binary, "/opt/praat/praat");
    assert_eq!(
        config.praat.resolved_prefs_dir(),
        PathBuf::from("/home/user/.praat-dir")
    );
    assert_eq!(config.events.capacity, 32);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = TomlConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, tgsync_common::Error::Io(_)));
}
