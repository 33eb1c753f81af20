//! Application configuration for Civicore.
//!
//! User config lives at `~/.civicore/civicore.toml`. CLI flags override
//! config file values, which override defaults. API keys are never stored in
//! the file — only the names of the environment variables holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CivicoreError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "civicore.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".civicore";

// ---------------------------------------------------------------------------
// Config structs (matching civicore.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Civic Information API settings.
    #[serde(default)]
    pub civic_api: CivicApiConfig,

    /// News-search API settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Crawl policies.
    #[serde(default)]
    pub crawl_policies: CrawlPoliciesConfig,

    /// Compiler settings, including the address corpus.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Entity database location.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.civicore/civicore.db".into()
}

/// `[civic_api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicApiConfig {
    /// Base URL of the Civic Information API.
    #[serde(default = "default_civic_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_civic_api_key_env")]
    pub api_key_env: String,
}

impl Default for CivicApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_civic_base_url(),
            api_key_env: default_civic_api_key_env(),
        }
    }
}

fn default_civic_base_url() -> String {
    "https://www.googleapis.com/civicinfo/v2".into()
}
fn default_civic_api_key_env() -> String {
    "CIVIC_INFO_API_KEY".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the custom-search endpoint.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Search engine id (`cx` parameter).
    #[serde(default)]
    pub engine_id: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_api_key_env(),
            engine_id: String::new(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_search_api_key_env() -> String {
    "CUSTOM_SEARCH_API_KEY".into()
}

/// `[crawl_policies]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlPoliciesConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects to follow per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Minimum candidate-name mentions for an article to count as relevant.
    #[serde(default = "default_min_mentions")]
    pub relevance_min_mentions: usize,
}

impl Default for CrawlPoliciesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            relevance_min_mentions: default_min_mentions(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}
fn default_min_mentions() -> usize {
    1
}

/// `[compiler]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Address corpus used to fan out contest queries per election.
    /// Queried in the listed order.
    #[serde(default)]
    pub addresses: Vec<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.civicore/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CivicoreError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.civicore/civicore.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does
/// not exist.
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
    let content = std::fs::read_to_string(path).map_err(|e| CivicoreError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CivicoreError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CivicoreError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CivicoreError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CivicoreError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve an API key from the named environment variable.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(CivicoreError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` in the configured database path.
pub fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.db_path;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| CivicoreError::config("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}
