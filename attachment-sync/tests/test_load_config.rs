use attachment_sync::load_config::{
    load_config, MONDAY_API_TOKEN, MONDAY_BOARD_ID, MONDAY_FILES_COLUMN_ID,
    MONDAY_URL_COLUMN_ID, NOTION_API_TOKEN, NOTION_BOT_USER_ID, NOTION_DATABASE_ID,
};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn set_required_env() {
    env::set_var(MONDAY_API_TOKEN, "monday-token");
    env::set_var(NOTION_API_TOKEN, "secret_notion");
    env::set_var(NOTION_DATABASE_ID, "db-123");
    env::set_var(MONDAY_BOARD_ID, "987654");
    env::set_var(MONDAY_URL_COLUMN_ID, "link_col");
    env::set_var(MONDAY_FILES_COLUMN_ID, "files_col");
    env::set_var(NOTION_BOT_USER_ID, "bot-user");
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
#[serial]
fn test_load_config_merges_yaml_and_env() {
    set_required_env();
    let file = config_file(
        r#"
server:
  bind: 127.0.0.1:8080
notion:
  files_property: Attachments
http:
  timeout_secs: 15
transfer:
  pacing_ms: 250
  retry:
    max_attempts: 3
    delay_ms: 100
ledger:
  path: ./state/seen.json
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert_eq!(config.notion.files_property, "Attachments");
    assert_eq!(config.notion.title_property, "Name");
    assert_eq!(config.notion.assignee_property, "Assignee");
    assert_eq!(config.http.timeout(), Duration::from_secs(15));
    assert_eq!(config.ledger.path, Some(PathBuf::from("./state/seen.json")));
    assert_eq!(config.env.monday_board_id, "987654");
    assert_eq!(config.env.notion_bot_user_id, "bot-user");

    let settings = config.sync_settings();
    assert_eq!(settings.url_column_id, "link_col");
    assert_eq!(settings.files_column_id, "files_col");
    assert_eq!(settings.transfer.pacing, Some(Duration::from_millis(250)));
}

#[test]
#[serial]
fn test_load_config_defaults_for_minimal_file() {
    set_required_env();
    let file = config_file("{}\n");

    let config = load_config(file.path()).expect("Defaults should apply");

    assert_eq!(config.server.bind, "0.0.0.0:3000");
    assert_eq!(config.monday.api_url, "https://api.monday.com/v2");
    assert_eq!(config.monday.file_url, "https://api.monday.com/v2/file");
    assert_eq!(config.notion.api_url, "https://api.notion.com/v1");
    assert_eq!(config.notion.version, "2022-06-28");
    assert_eq!(config.http.timeout(), Duration::from_secs(60));
    assert_eq!(config.ledger.path, None);
    assert_eq!(config.transfer_options().pacing, None);
}

#[test]
#[serial]
fn test_load_config_names_the_missing_variable() {
    set_required_env();
    env::remove_var(MONDAY_FILES_COLUMN_ID);
    let file = config_file("{}\n");

    let err = load_config(file.path()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains(MONDAY_FILES_COLUMN_ID), "got: {msg}");
}

#[test]
#[serial]
fn test_load_config_rejects_blank_variable() {
    set_required_env();
    env::set_var(NOTION_BOT_USER_ID, "   ");
    let file = config_file("{}\n");

    let err = load_config(file.path()).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains(NOTION_BOT_USER_ID), "got: {msg}");
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    set_required_env();
    let file = config_file("not-yaml: [:::");

    let err = load_config(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    set_required_env();
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_load_config_rejects_zero_timeout() {
    set_required_env();
    let file = config_file("http:\n  timeout_secs: 0\n");

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}
