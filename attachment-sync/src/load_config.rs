/// `load_config` module: loads the static YAML config and injects the required
/// environment secrets and identifiers into one [`CliConfig`].
///
/// This module is the only place where untrusted YAML and environment input is
/// parsed and mapped to strongly-typed settings.
///
/// # Responsibilities
/// - Parse the YAML file (no secrets) into typed sections with defaults
/// - Read every required environment variable after `.env` has been loaded,
///   failing fast with the name of the first one that is missing or empty
/// - Map loose knobs (pacing, retry) onto the core's [`TransferOptions`]
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Context, Result};
use attachment_sync_core::pipeline::{FixedBackoff, NoRetry, RetryPolicy, TransferOptions};
use attachment_sync_core::synchronise::SyncSettings;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const MONDAY_API_TOKEN: &str = "MONDAY_API_TOKEN";
pub const NOTION_API_TOKEN: &str = "NOTION_API_TOKEN";
pub const NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const MONDAY_BOARD_ID: &str = "MONDAY_BOARD_ID";
pub const MONDAY_URL_COLUMN_ID: &str = "MONDAY_URL_COLUMN_ID";
pub const MONDAY_FILES_COLUMN_ID: &str = "MONDAY_FILES_COLUMN_ID";
pub const NOTION_BOT_USER_ID: &str = "NOTION_BOT_USER_ID";

/// Everything the binary needs: static YAML sections plus environment secrets.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub server: ServerSection,
    pub monday: MondaySection,
    pub notion: NotionSection,
    pub http: HttpSection,
    pub transfer: TransferSection,
    pub ledger: LedgerSection,
    pub env: EnvSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MondaySection {
    /// GraphQL endpoint.
    pub api_url: String,
    /// Multipart endpoint for `add_file_to_column`.
    pub file_url: String,
    pub api_version: String,
}

impl Default for MondaySection {
    fn default() -> Self {
        Self {
            api_url: "https://api.monday.com/v2".to_string(),
            file_url: "https://api.monday.com/v2/file".to_string(),
            api_version: "2024-10".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionSection {
    pub api_url: String,
    pub version: String,
    pub title_property: String,
    pub assignee_property: String,
    pub files_property: String,
}

impl Default for NotionSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.notion.com/v1".to_string(),
            version: "2022-06-28".to_string(),
            title_property: "Name".to_string(),
            assignee_property: "Assignee".to_string(),
            files_property: "Files".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl HttpSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransferSection {
    /// Sleep after each completed transfer, in milliseconds.
    pub pacing_ms: Option<u64>,
    pub retry: RetrySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts per transfer. 1 disables retrying.
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// JSON file for transferred block ids. In-memory when unset.
    pub path: Option<PathBuf>,
}

/// Required environment values.
#[derive(Clone)]
pub struct EnvSettings {
    pub monday_api_token: String,
    pub notion_api_token: String,
    pub notion_database_id: String,
    pub monday_board_id: String,
    pub monday_url_column_id: String,
    pub monday_files_column_id: String,
    pub notion_bot_user_id: String,
}

impl std::fmt::Debug for EnvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSettings")
            .field("monday_api_token", &"<redacted>")
            .field("notion_api_token", &"<redacted>")
            .field("notion_database_id", &self.notion_database_id)
            .field("monday_board_id", &self.monday_board_id)
            .field("monday_url_column_id", &self.monday_url_column_id)
            .field("monday_files_column_id", &self.monday_files_column_id)
            .field("notion_bot_user_id", &self.notion_bot_user_id)
            .finish()
    }
}

impl EnvSettings {
    /// Reads all required variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            monday_api_token: required(MONDAY_API_TOKEN)?,
            notion_api_token: required(NOTION_API_TOKEN)?,
            notion_database_id: required(NOTION_DATABASE_ID)?,
            monday_board_id: required(MONDAY_BOARD_ID)?,
            monday_url_column_id: required(MONDAY_URL_COLUMN_ID)?,
            monday_files_column_id: required(MONDAY_FILES_COLUMN_ID)?,
            notion_bot_user_id: required(NOTION_BOT_USER_ID)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Ok(_) => {
            error!(variable = name, "Required environment variable is empty");
            Err(anyhow!("environment variable {name} must not be empty"))
        }
        Err(e) => {
            error!(variable = name, error = %e, "Required environment variable missing");
            Err(anyhow!("environment variable {name} is required: {e}"))
        }
    }
}

impl CliConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        let retry: Arc<dyn RetryPolicy> = if self.transfer.retry.max_attempts > 1 {
            Arc::new(FixedBackoff {
                max_attempts: self.transfer.retry.max_attempts,
                delay: Duration::from_millis(self.transfer.retry.delay_ms),
            })
        } else {
            Arc::new(NoRetry)
        };
        TransferOptions {
            pacing: self
                .transfer
                .pacing_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            retry,
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            url_column_id: self.env.monday_url_column_id.clone(),
            files_column_id: self.env.monday_files_column_id.clone(),
            transfer: self.transfer_options(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    server: ServerSection,
    monday: MondaySection,
    notion: NotionSection,
    http: HttpSection,
    transfer: TransferSection,
    ledger: LedgerSection,
}

/// Loads a static YAML config file (no secrets) and injects required env vars.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(&config_content).map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            anyhow!("Failed to parse config YAML: {e}")
        })?
    };
    info!(config_path = ?path_ref, bind = %raw.server.bind, "Parsed config YAML successfully");

    if raw.http.timeout_secs == 0 {
        return Err(anyhow!("http.timeout_secs must be positive"));
    }
    if raw.transfer.retry.max_attempts == 0 {
        return Err(anyhow!("transfer.retry.max_attempts must be at least 1"));
    }

    let env = EnvSettings::from_env().context("Missing required environment configuration")?;

    Ok(CliConfig {
        server: raw.server,
        monday: raw.monday,
        notion: raw.notion,
        http: raw.http,
        transfer: raw.transfer,
        ledger: raw.ledger,
        env,
    })
}
