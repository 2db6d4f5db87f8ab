//! Config loading and default locations.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Config;

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the defaults. Returns the path actually read, if
/// any.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };

    if !config_path.exists() {
        if path.is_some() {
            anyhow::bail!("config file {} does not exist", config_path.display());
        }
        return Ok((Config::default(), None));
    }

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config {}", config_path.display()))?;
    Ok((config, Some(config_path)))
}

/// The default config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("portico")
}

fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// This machine's host name, used as the certificate subject by default.
pub fn default_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
