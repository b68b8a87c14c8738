//! Configuration loading and validation.
//!
//! Settings come from an optional JSON file; every field has a default so a
//! missing file is equivalent to `default_config()`.
use crate::model::DEFAULT_SHAREPOINT_DOMAIN;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Public client id of the Microsoft Graph command-line tools app.
pub const DEFAULT_CLIENT_ID: &str = "14d82eec-204b-4c2f-b7e8-296a70dab67e";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

const APP_DIR: &str = "spolabel";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub schema_version: u32,
    /// Application (client) id used for device-code sign-in.
    pub client_id: String,
    pub authority_host: String,
    pub graph_base_url: String,
    /// Domain suffix for tenant and admin hosts.
    pub sharepoint_domain: String,
    /// Read the site label back after assigning it.
    pub verify_assignment: bool,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

pub fn default_config() -> Config {
    Config {
        schema_version: CONFIG_SCHEMA_VERSION,
        client_id: DEFAULT_CLIENT_ID.to_string(),
        authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
        sharepoint_domain: DEFAULT_SHAREPOINT_DOMAIN.to_string(),
        verify_assignment: false,
        http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
    }
}

/// `<config dir>/spolabel/config.json`, when a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Resolve the active config.
///
/// An explicit path must exist. The default location is used only if present;
/// otherwise built-in defaults apply.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(&path),
        _ => Ok(default_config()),
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.client_id.trim().is_empty() {
        return Err(anyhow!("client_id must be non-empty"));
    }
    validate_https_url(&config.authority_host, "authority_host")?;
    validate_https_url(&config.graph_base_url, "graph_base_url")?;
    let domain = config.sharepoint_domain.trim();
    if domain.is_empty() || domain.contains('/') || domain.contains(char::is_whitespace) {
        return Err(anyhow!(
            "sharepoint_domain must be a bare host suffix (got {:?})",
            config.sharepoint_domain
        ));
    }
    if config.http_timeout_secs == 0 {
        return Err(anyhow!("http_timeout_secs must be greater than zero"));
    }
    Ok(())
}

fn validate_https_url(value: &str, label: &str) -> Result<()> {
    let Some(host) = value.strip_prefix("https://") else {
        return Err(anyhow!("{label} must be an https URL (got {value:?})"));
    };
    if host.trim_end_matches('/').is_empty() {
        return Err(anyhow!("{label} is missing a host"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
