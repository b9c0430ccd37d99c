//! CLI Configuration
//!
//! Resolution order: `--config`, `SERVICEDESK_CONFIG`, then
//! `~/.servicedesk/config.toml`. Without any file the built-in defaults apply.

use anyhow::{Context, Result};
use servicedesk_core::DeskConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".servicedesk").join("config.toml"))
}

/// Load the desk configuration. An explicitly named file must exist; the
/// default location is optional.
pub fn load(explicit: Option<&Path>) -> Result<DeskConfig> {
    if let Some(path) = explicit {
        return DeskConfig::load(path).with_context(|| format!("loading config from {}", path.display()));
    }

    match default_path() {
        Some(path) if path.exists() => {
            DeskConfig::load(&path).with_context(|| format!("loading config from {}", path.display()))
        }
        _ => {
            tracing::debug!("no config file found, using defaults");
            Ok(DeskConfig::default())
        }
    }
}

/// Write the default configuration as TOML. Existing files are kept unless
/// `force` is set. Returns whether a file was written.
pub fn write_default(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(&DeskConfig::default()).context("serializing default config")?;
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}
