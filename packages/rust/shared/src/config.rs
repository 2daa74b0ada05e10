//! Application configuration for dbbuilder.
//!
//! Config is read from `./dbbuilder.toml` when present, otherwise from
//! `~/.dbbuilder/dbbuilder.toml`, otherwise defaults are used. Secrets are never
//! stored in the file, only the names of the env vars that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DbBuilderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dbbuilder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dbbuilder";

/// Link substrings that mark a search result as not being a company site.
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &[
    // marketplaces
    "amazon.",
    "ebay.",
    "alibaba.",
    "aliexpress.",
    "walmart.",
    "homedepot.",
    "lowes.",
    "etsy.",
    "made-in-china.",
    "thomasnet.",
    // social
    "facebook.",
    "twitter.",
    "x.com",
    "linkedin.",
    "instagram.",
    "youtube.",
    "pinterest.",
    "reddit.",
    "tiktok.",
    // reference / news
    "wikipedia.",
    "news",
    "forbes.",
    "bloomberg.",
    "reuters.",
    "yelp.",
    // government
    ".gov",
];

// ---------------------------------------------------------------------------
// Config structs (matching dbbuilder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative-text service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Search service settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry policy for external calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch and generation sizes.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_llm_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Custom Search JSON API endpoint.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search engine id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Delay before the single retry of a page that returned a 5xx.
    #[serde(default = "default_server_error_delay")]
    pub server_error_delay_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_api_key_env(),
            engine_id_env: default_engine_id_env(),
            server_error_delay_secs: default_server_error_delay(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_search_api_key_env() -> String {
    "GOOGLE_SEARCH_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "GOOGLE_SEARCH_ENGINE_ID".into()
}
fn default_server_error_delay() -> u64 {
    30
}
fn default_search_timeout() -> u64 {
    30
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Fixed wait after a rate-limit response.
    #[serde(default = "default_backoff")]
    pub rate_limit_backoff_secs: u64,

    /// Attempts per external call before giving up. `0` retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limit_backoff_secs: default_backoff(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryConfig {
    /// Backoff as a [`Duration`].
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }

    /// Attempt cap, `None` when unbounded.
    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }
}

fn default_backoff() -> u64 {
    15
}
fn default_max_attempts() -> u32 {
    20
}

/// What the scheduler does when one unit of a chunk fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFailurePolicy {
    /// Cancel the rest of the chunk and stop the run.
    Halt,
    /// Log the failure, keep sibling results, carry on.
    #[default]
    Isolate,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Targets processed concurrently per chunk (parameter and manufacturer modes).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Names processed concurrently per chunk (URL finder modes).
    #[serde(default = "default_finder_batch")]
    pub finder_batch_size: usize,

    /// Exact number of parameters per target and values per parameter.
    #[serde(default = "default_record_count")]
    pub record_count: usize,

    /// Generations attempted before giving up on an exact-length list. `0` retries forever.
    #[serde(default = "default_max_generations")]
    pub max_generations: u32,

    /// Search results requested per manufacturer query.
    #[serde(default = "default_manufacturer_results")]
    pub manufacturer_results: usize,

    /// Search results requested per website lookup.
    #[serde(default = "default_website_results")]
    pub website_results: usize,

    /// Search results requested per product-page lookup.
    #[serde(default = "default_product_page_results")]
    pub product_page_results: usize,

    /// Grace period before a parameter run starts.
    #[serde(default = "default_start_delay")]
    pub start_delay_secs: u64,

    /// Behaviour when one unit of a chunk fails.
    #[serde(default)]
    pub on_unit_failure: UnitFailurePolicy,

    /// Link substrings excluded before any judgement is made.
    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            finder_batch_size: default_finder_batch(),
            record_count: default_record_count(),
            max_generations: default_max_generations(),
            manufacturer_results: default_manufacturer_results(),
            website_results: default_website_results(),
            product_page_results: default_product_page_results(),
            start_delay_secs: default_start_delay(),
            on_unit_failure: UnitFailurePolicy::default(),
            exclude_keywords: default_exclude_keywords(),
        }
    }
}

impl PipelineConfig {
    /// Generation cap, `None` when unbounded.
    pub fn generation_limit(&self) -> Option<u32> {
        (self.max_generations > 0).then_some(self.max_generations)
    }
}

fn default_chunk_size() -> usize {
    3
}
fn default_finder_batch() -> usize {
    10
}
fn default_record_count() -> usize {
    20
}
fn default_max_generations() -> u32 {
    10
}
fn default_manufacturer_results() -> usize {
    100
}
fn default_website_results() -> usize {
    50
}
fn default_product_page_results() -> usize {
    10
}
fn default_start_delay() -> u64 {
    5
}
fn default_exclude_keywords() -> Vec<String> {
    DEFAULT_EXCLUDE_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory for generated tables.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Target list for the parameter and manufacturer modes.
    #[serde(default = "default_remaining_file")]
    pub remaining_file: PathBuf,

    /// Manufacturer names for the website finder.
    #[serde(default = "default_names_file")]
    pub manufacturer_names_file: PathBuf,

    /// Website table written by the website finder, read by the product-page finder.
    #[serde(default = "default_websites_file")]
    pub websites_file: PathBuf,

    /// Product-page table written by the product-page finder.
    #[serde(default = "default_product_pages_file")]
    pub product_pages_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            remaining_file: default_remaining_file(),
            manufacturer_names_file: default_names_file(),
            websites_file: default_websites_file(),
            product_pages_file: default_product_pages_file(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_remaining_file() -> PathBuf {
    PathBuf::from("remaining.csv")
}
fn default_names_file() -> PathBuf {
    PathBuf::from("manufacturer_names.csv")
}
fn default_websites_file() -> PathBuf {
    PathBuf::from("data/manufacturer_websites.csv")
}
fn default_product_pages_file() -> PathBuf {
    PathBuf::from("data/manufacturer_product_pages.csv")
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dbbuilder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DbBuilderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.dbbuilder/dbbuilder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config. A `dbbuilder.toml` in the working directory wins
/// over the user config; defaults are returned when neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DbBuilderError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DbBuilderError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DbBuilderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DbBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DbBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the named env var; empty values count as missing.
pub fn resolve_secret(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DbBuilderError::config(format!(
            "{var_name} is not set. Export it before running."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("GOOGLE_SEARCH_ENGINE_ID"));
        assert!(toml_str.contains("on_unit_failure = \"isolate\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.chunk_size, 3);
        assert_eq!(parsed.pipeline.record_count, 20);
        assert_eq!(parsed.retry.rate_limit_backoff_secs, 15);
        assert_eq!(parsed.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
chunk_size = 5
on_unit_failure = "halt"

[retry]
max_attempts = 0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.chunk_size, 5);
        assert_eq!(config.pipeline.on_unit_failure, UnitFailurePolicy::Halt);
        assert_eq!(config.pipeline.finder_batch_size, 10);
        assert_eq!(config.retry.attempt_limit(), None);
        assert_eq!(config.retry.backoff(), Duration::from_secs(15));
        assert!(!config.pipeline.exclude_keywords.is_empty());
    }

    #[test]
    fn limits_from_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.retry.attempt_limit(), Some(20));
        assert_eq!(config.pipeline.generation_limit(), Some(10));
    }

    #[test]
    fn secret_resolution() {
        // Use a unique env var name to avoid interfering with other tests
        let result = resolve_secret("DBB_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("is not set"));
    }
}
