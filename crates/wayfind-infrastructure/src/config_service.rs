//! Configuration service implementation.
//!
//! Loads the workflow configuration from `config.toml`
//! (`~/.config/wayfind/config.toml` unless a path is given), writing a
//! default file the first time.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use wayfind_core::config::WorkflowConfig;
use wayfind_core::error::{Result, WayfindError};

use crate::paths::WayfindPaths;

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Uses the platform default config file.
    pub fn new() -> Result<Self> {
        let path = WayfindPaths::config_file().map_err(|e| WayfindError::config(e.to_string()))?;
        Ok(Self { path })
    }

    /// Uses an explicit config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, creating the file with defaults if missing.
    pub fn load(&self) -> Result<WorkflowConfig> {
        if !self.path.exists() {
            tracing::info!(
                "[Config] {} not found, writing defaults",
                self.path.display()
            );
            let config = WorkflowConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let text = fs::read_to_string(&self.path)?;
        let config: WorkflowConfig = toml::from_str(&text)?;
        tracing::debug!("[Config] loaded {}", self.path.display());
        Ok(config)
    }

    /// Writes `config` to the config file, creating parent directories.
    ///
    /// The file is written to a sibling temp file, synced, then renamed over
    /// the config, so readers never see a partial file.
    pub fn save(&self, config: &WorkflowConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(config)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(text.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        tracing::debug!("[Config] saved {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            WayfindError::config(format!("{} is not a file path", self.path.display()))
        })?;
        Ok(self
            .path
            .with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let service = ConfigService::with_path(&path);

        let config = service.load().expect("Should load defaults");
        assert_eq!(config, WorkflowConfig::default());
        assert!(path.exists(), "Default config should be written");
    }

    #[test]
    fn test_saved_config_is_loaded_back() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let mut config = WorkflowConfig::default();
        config.debounce_ms = 400;
        config.feature_query.field = "NAME".to_string();
        service.save(&config).unwrap();

        assert_eq!(service.load().unwrap(), config);
    }

    #[test]
    fn test_save_replaces_file_without_leaving_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "debounce_ms = 1").unwrap();
        let service = ConfigService::with_path(&path);

        let mut config = WorkflowConfig::default();
        config.debounce_ms = 275;
        service.save(&config).unwrap();

        assert_eq!(service.load().unwrap().debounce_ms, 275);
        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["config.toml"]);
    }

    #[test]
    fn test_save_rejects_path_without_file_name() {
        let err = ConfigService::with_path("/").save(&WorkflowConfig::default()).unwrap_err();
        assert!(matches!(err, WayfindError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "debounce_ms = \"soon\"").unwrap();

        let err = ConfigService::with_path(path).load().unwrap_err();
        assert!(matches!(err, WayfindError::Serialization { .. }));
    }
}
