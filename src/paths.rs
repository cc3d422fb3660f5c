//! Centralized path resolution for provisio
//!
//! Platform-aware path resolution with environment variable overrides, so
//! configuration can live in a dotfiles repository and profiles in a
//! throwaway directory during testing.
//!
//! # Environment Variables
//!
//! - `PROVISIO_CONFIG_DIR` - Override config directory
//! - `PROVISIO_STATE_DIR` - Override state directory (profiles live here)
//! - `PROVISIO_CACHE_DIR` - Override cache directory (artifacts and backups)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PROVISIO_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/provisio` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\provisio`
//!    - macOS/Linux: `~/.config/provisio`
//!
//! For state_dir():
//! 1. `PROVISIO_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/provisio` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\provisio`
//!    - macOS/Linux: `~/.local/state/provisio`
//!
//! For cache_dir():
//! 1. `PROVISIO_CACHE_DIR` environment variable
//! 2. `XDG_CACHE_HOME/provisio` (if set)
//! 3. Platform cache directory, falling back to `~/.cache/provisio`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "provisio";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PROVISIO_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "PROVISIO_STATE_DIR";

/// Environment variable for cache directory override
pub const ENV_CACHE_DIR: &str = "PROVISIO_CACHE_DIR";

/// Get the provisio config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the provisio state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_DIR);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Get the provisio cache directory path
pub fn cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
        let path = expand(&dir);
        log::debug!("Using cache dir from {}: {}", ENV_CACHE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
        let path = PathBuf::from(xdg_cache).join(APP_DIR);
        log::debug!("Using XDG_CACHE_HOME: {}", path.display());
        return Ok(path);
    }

    if let Some(cache) = dirs::cache_dir() {
        return Ok(cache.join(APP_DIR));
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".cache").join(APP_DIR))
}

/// Directory holding one TOML file per profile
pub fn profiles_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("profiles"))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
