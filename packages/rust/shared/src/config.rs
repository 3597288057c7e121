//! Application configuration for LinkForge.
//!
//! User config lives at `~/.linkforge/linkforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linkforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".linkforge";

// ---------------------------------------------------------------------------
// Config structs (matching linkforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Linking defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Heading text that delimits the target region.
    #[serde(default = "default_marker_text")]
    pub marker_text: String,

    /// Minimum ms between documents, to respect store API quotas.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            marker_text: default_marker_text(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn default_marker_text() -> String {
    "Product Description".into()
}
fn default_pacing_ms() -> u64 {
    500
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Public storefront base URL (e.g., `https://shop.example.com`).
    #[serde(default)]
    pub base_url: String,

    /// Shop name for the admin API; `.myshopify.com` is appended if missing.
    #[serde(default)]
    pub shop: String,

    /// Name of the env var holding the admin access token (never store the
    /// token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            shop: String::new(),
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "SHOPIFY_API_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.linkforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.linkforge/linkforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LinkForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LinkForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the admin access token env var is set and non-empty.
pub fn validate_token(config: &AppConfig) -> Result<()> {
    let var_name = &config.store.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(LinkForgeError::config(format!(
            "store access token not found. Set the {var_name} environment variable."
        ))),
    }
}
