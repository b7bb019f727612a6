//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which points the client at the remote document store and blob store.
//!
//! Configuration is stored at `~/.config/devicedex/config.json`. The
//! `DEVICEDEX_API_URL` and `DEVICEDEX_STORAGE_URL` environment variables
//! override the stored endpoints at use time; overrides are never written
//! back to the file.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "devicedex";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default document store endpoint
const DEFAULT_API_URL: &str = "https://api.devicedex.app/v1";

/// Default blob store endpoint
const DEFAULT_STORAGE_URL: &str = "https://storage.devicedex.app";

/// Environment override for [`Config::api_endpoint`]
const API_URL_ENV: &str = "DEVICEDEX_API_URL";

/// Environment override for [`Config::storage_endpoint`]
const STORAGE_URL_ENV: &str = "DEVICEDEX_STORAGE_URL";

/// Default top-level folder for uploaded device images
const DEFAULT_STORAGE_ROOT: &str = "device_images";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub storage_url: String,
    pub storage_root: String,
    pub cache_dir: Option<PathBuf>,
    pub admin_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            cache_dir: None,
            admin_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Document store endpoint, honouring `DEVICEDEX_API_URL`.
    pub fn api_endpoint(&self) -> String {
        env_or(API_URL_ENV, &self.api_url)
    }

    /// Blob store endpoint, honouring `DEVICEDEX_STORAGE_URL`.
    pub fn storage_endpoint(&self) -> String {
        env_or(STORAGE_URL_ENV, &self.storage_url)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root for the snapshot files and the `images/` cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

/// Non-empty value of `var`, else `stored`.
fn env_or(var: &str, stored: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| stored.to_string())
}
