//! Application configuration for sheetbind.
//!
//! User config lives at `~/.sheetbind/sheetbind.toml`.
//! Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetbindError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sheetbind.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sheetbind";

// ---------------------------------------------------------------------------
// Config structs (matching sheetbind.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote sheet coordinates.
    #[serde(default)]
    pub sheet: SheetConfig,

    /// Local content cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Language-specific strings used when binding contact slots.
    #[serde(default)]
    pub binding: BindingConfig,
}

/// `[sheet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Sheets API base, without trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Spreadsheet identifier from the sheet URL.
    #[serde(default = "default_sheet_id")]
    pub sheet_id: String,

    /// Tab name holding the `field_id` / `uk_text` table.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            sheet_id: default_sheet_id(),
            sheet_name: default_sheet_name(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4".into()
}
fn default_sheet_id() -> String {
    "YOUR_GOOGLE_SHEET_ID".into()
}
fn default_sheet_name() -> String {
    "Sheet1".into()
}
fn default_api_key_env() -> String {
    "SHEETBIND_API_KEY".into()
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache age before a fresh fetch is required.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// libSQL database file backing the cache. `~` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Store key holding the serialized content map.
    #[serde(default = "default_content_key")]
    pub content_key: String,

    /// Store key holding the write time (millisecond epoch).
    #[serde(default = "default_time_key")]
    pub time_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            db_path: default_db_path(),
            content_key: default_content_key(),
            time_key: default_time_key(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    60 * 60
}
fn default_db_path() -> String {
    "~/.sheetbind/cache.db".into()
}
fn default_content_key() -> String {
    "dobrolikar_content".into()
}
fn default_time_key() -> String {
    "dobrolikar_cache_time".into()
}

/// `[binding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Bold label prefixed to the address paragraph.
    #[serde(default = "default_address_label")]
    pub address_label: String,

    /// Substring identifying the weekday hours line.
    #[serde(default = "default_weekday_marker")]
    pub weekday_marker: String,

    /// Substring identifying the Saturday hours line.
    #[serde(default = "default_saturday_marker")]
    pub saturday_marker: String,

    /// Substring identifying the Sunday hours line.
    #[serde(default = "default_sunday_marker")]
    pub sunday_marker: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            address_label: default_address_label(),
            weekday_marker: default_weekday_marker(),
            saturday_marker: default_saturday_marker(),
            sunday_marker: default_sunday_marker(),
        }
    }
}

fn default_address_label() -> String {
    "Адреса:".into()
}
fn default_weekday_marker() -> String {
    "Пн-Пт".into()
}
fn default_saturday_marker() -> String {
    "Сб:".into()
}
fn default_sunday_marker() -> String {
    "Нд:".into()
}

// ---------------------------------------------------------------------------
// Runtime settings (resolved from config + environment)
// ---------------------------------------------------------------------------

/// Everything needed to address the remote sheet.
#[derive(Debug, Clone)]
pub struct SheetSource {
    pub api_base: String,
    pub sheet_id: String,
    pub sheet_name: String,
    /// Resolved from the env var named in config; `None` if unset or empty.
    pub api_key: Option<String>,
}

impl From<&AppConfig> for SheetSource {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_base: config.sheet.api_base.trim_end_matches('/').to_string(),
            sheet_id: config.sheet.sheet_id.clone(),
            sheet_name: config.sheet.sheet_name.clone(),
            api_key: resolve_api_key(config),
        }
    }
}

/// Cache parameters with the TTL as a duration and the db path expanded.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: chrono::Duration,
    pub db_path: PathBuf,
    pub content_key: String,
    pub time_key: String,
}

impl From<&AppConfig> for CacheSettings {
    fn from(config: &AppConfig) -> Self {
        // chrono::Duration is millisecond-bounded
        let ttl_secs = config.cache.ttl_secs.min(i64::MAX as u64 / 1_000) as i64;
        Self {
            ttl: chrono::Duration::seconds(ttl_secs),
            db_path: expand_home(&config.cache.db_path),
            content_key: config.cache.content_key.clone(),
            time_key: config.cache.time_key.clone(),
        }
    }
}

/// Read the API key from the env var named in config.
pub fn resolve_api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.sheet.api_key_env)
        .ok()
        .filter(|val| !val.is_empty())
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sheetbind/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SheetbindError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sheetbind/sheetbind.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SheetbindError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SheetbindError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SheetbindError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SheetbindError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SheetbindError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
