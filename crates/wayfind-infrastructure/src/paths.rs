//! Path management for wayfind configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/wayfind/           # Config directory (platform default)
//! └── config.toml              # Workflow configuration
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "wayfind";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct WayfindPaths;

impl WayfindPaths {
    /// Returns the wayfind configuration directory (e.g. `~/.config/wayfind/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
