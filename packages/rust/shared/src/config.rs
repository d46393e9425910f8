//! Application configuration for brandscan.
//!
//! User config lives at `~/.brandscan/brandscan.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BrandScanError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brandscan.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brandscan";

// ---------------------------------------------------------------------------
// Config structs (matching brandscan.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global scan defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Backend gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Chat completion settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default maximum pages fetched during discovery.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pages scraped concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between scrape batches, to avoid saturating the scrape service.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Focused-retry budget per page extraction.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_pages() -> usize {
    10
}
fn default_batch_size() -> usize {
    5
}
fn default_batch_delay_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    2
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the backend gateway.
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_gateway_url() -> String {
    "http://localhost:8787".into()
}
fn default_api_key_env() -> String {
    "BRANDSCAN_GATEWAY_KEY".into()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Default model for extraction and research analysis.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brandscan/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrandScanError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brandscan/brandscan.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| BrandScanError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BrandScanError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrandScanError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrandScanError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrandScanError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the gateway API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.gateway.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(BrandScanError::config(format!(
            "gateway API key not found. Set the {var_name} environment variable."
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
        assert!(toml_str.contains("max_pages"));
        assert!(toml_str.contains("BRANDSCAN_GATEWAY_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_pages, 10);
        assert_eq!(parsed.defaults.batch_size, 5);
        assert_eq!(parsed.gateway.api_key_env, "BRANDSCAN_GATEWAY_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[gateway]
base_url = "https://gateway.internal:9000"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.gateway.base_url, "https://gateway.internal:9000");
        assert_eq!(config.defaults.batch_delay_ms, 500);
        assert_eq!(config.completion.model, "moonshotai/kimi-k2.5");
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.gateway.api_key_env = "BS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
