//! Configuration loading and root folder resolution tests
//!
//! Tests touching JAMSYNC_ROOT_FOLDER are #[serial] so they do not race
//! on the process environment.

use jamsync_common::config::{
    default_root_folder, LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig, DATABASE_FILE,
    DEFAULT_SESSION_BPM, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.session.default_bpm, DEFAULT_SESSION_BPM);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.feeds.lyrics_timeout_secs, 6);
    assert_eq!(config.feeds.tablature_timeout_secs, 8);
    assert!(config.root_folder.is_none());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/jamsync"

[session]
default_bpm = 96

[feeds]
lyrics_timeout_secs = 7
"#,
    )
    .unwrap();

    let config = TomlConfig::from_file(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/jamsync")));
    assert_eq!(config.session.default_bpm, 96);
    assert_eq!(config.feeds.lyrics_timeout_secs, 7);
    assert_eq!(config.feeds.tablature_timeout_secs, 8);
    assert_eq!(config.feeds.lyrics_base_url, "https://lrclib.net/api");
}

#[test]
fn test_missing_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig::load_or_default(Some(&dir.path().join("absent.toml")));
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "session = [[[").unwrap();

    assert!(TomlConfig::from_file(&path).is_err());
    assert_eq!(TomlConfig::load_or_default(Some(&path)), TomlConfig::default());
}

#[test]
fn test_logging_level_becomes_filter_directives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = TomlConfig::load_or_default(Some(&path));
    assert_eq!(
        config.logging.filter_directives(),
        "jamsync_server=debug,jamsync_common=debug,tower_http=debug"
    );

    let blank = LoggingConfig { level: "  ".to_string() };
    assert_eq!(blank.filter_directives(), TomlConfig::default().logging.filter_directives());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/jamsync-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/jamsync-toml")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/jamsync-cli")), &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/jamsync-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/jamsync-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/jamsync-toml")),
        ..Default::default()
    };

    assert_eq!(
        RootFolderResolver::new(None, &toml).resolve(),
        PathBuf::from("/tmp/jamsync-env")
    );

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/jamsync-toml")),
        ..Default::default()
    };
    assert_eq!(
        RootFolderResolver::new(None, &toml).resolve(),
        PathBuf::from("/tmp/jamsync-toml")
    );
    assert_eq!(
        RootFolderResolver::new(None, &TomlConfig::default()).resolve(),
        default_root_folder()
    );
}

#[test]
fn test_initializer_creates_folder() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
}
