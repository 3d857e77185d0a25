//! Tests for configuration loading.

use boardside::{BoardsideConfig, DispatchSettings};
use boardside::config::{DATABASE_VAR, ENGINE_PATH_VAR, TELEGRAM_TOKEN_VAR};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(toml.as_bytes()).expect("Failed to write config");
    file
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[engine]
path = "/usr/games/stockfish"
movetime_ms = 250

[server]
port = 8080
"#,
    );

    let config = BoardsideConfig::from_file(file.path()).expect("config parses");
    assert_eq!(config.engine().path(), "/usr/games/stockfish");
    assert_eq!(config.engine().movetime(), Duration::from_millis(250));
    assert_eq!(config.engine().timeout(), Duration::from_secs(5));
    assert_eq!(config.server().port(), &8080);
    assert_eq!(config.server().host(), "127.0.0.1");
    assert!(*config.game().apply_suggestion());
    assert_eq!(config.database().path(), &None);
}

#[test]
fn test_depth_goes_into_search_budget() {
    let file = write_config(
        r#"
[engine]
depth = 12

[game]
apply_suggestion = false
"#,
    );

    let config = BoardsideConfig::from_file(file.path()).expect("config parses");
    let settings = DispatchSettings::from_config(&config);
    assert!(!settings.apply_suggestion());
    assert_eq!(settings.budget().go_command(), "go depth 12");
}

#[test]
fn test_invalid_file_is_an_error() {
    let file = write_config("[engine\npath = ");
    assert!(BoardsideConfig::from_file(file.path()).is_err());
}

#[test]
fn test_overrides_replace_file_values() {
    let config = BoardsideConfig::default().with_overrides(|key| match key {
        k if k == ENGINE_PATH_VAR => Some("/opt/engine".to_string()),
        k if k == TELEGRAM_TOKEN_VAR => Some("123:abc".to_string()),
        k if k == DATABASE_VAR => Some("boardside.db".to_string()),
        _ => None,
    });

    assert_eq!(config.engine().path(), "/opt/engine");
    assert_eq!(config.telegram().token().as_deref(), Some("123:abc"));
    assert_eq!(config.database().path().as_deref(), Some("boardside.db"));
}

#[test]
fn test_listener_flags_win() {
    let config = BoardsideConfig::default().with_listener(Some("0.0.0.0".to_string()), None);
    assert_eq!(config.server().host(), "0.0.0.0");
    assert_eq!(config.server().port(), &3000);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config =
        BoardsideConfig::load(dir.path().join("absent.toml")).expect("defaults without a file");
    assert_eq!(config.server().port(), &3000);
    assert_eq!(config.engine().movetime(), Duration::from_millis(100));
}
