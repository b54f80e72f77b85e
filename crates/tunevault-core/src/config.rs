//! Application configuration management.
//!
//! Loads and saves the application-wide settings, most importantly the
//! storage root the record stores live under.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Root directory the record stores live under; each store keeps its
    /// entries in its own subdirectory.
    pub storage_directory: PathBuf,
    /// Default pixel count presentation passes to the artwork best-fit
    /// selector.
    #[serde(default = "default_artwork_target_pixel_count")]
    pub artwork_target_pixel_count: u64,
}

/// 854x480, a medium thumbnail slot.
const fn default_artwork_target_pixel_count() -> u64 {
    409_920
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_directory: default_storage_directory(),
            artwork_target_pixel_count: default_artwork_target_pixel_count(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, or create the default if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        if !config_path.exists() {
            debug!("Config file not found, using defaults");
            let config = Self::default();
            if let Err(e) = config.save() {
                warn!("Failed to save default config: {}", e);
            }
            return Ok(config);
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {e}",
                config_path.display()
            ))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", config_path.display());
        debug!("Storage directory: {}", config.storage_directory.display());

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        let config_path = config_file_path();

        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to write config file {}: {e}",
                config_path.display()
            ))
        })?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Update the storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist and cannot be
    /// created, or isn't writable.
    pub fn set_storage_directory(&mut self, path: PathBuf) -> Result<()> {
        validate_storage_directory(&path)?;

        self.storage_directory = path;
        info!(
            "Updated storage directory to: {}",
            self.storage_directory.display()
        );
        Ok(())
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

/// Get the default storage directory.
#[must_use]
pub fn default_storage_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunevault")
        .join("stores")
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("tunevault")
        .join("config.json")
}

/// Validate that a directory is suitable as the storage root.
fn validate_storage_directory(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(Error::Configuration(
            "Storage directory must be an absolute path".to_string(),
        ));
    }

    if path.exists() {
        if !path.is_dir() {
            return Err(Error::Configuration(format!(
                "Path exists but is not a directory: {}",
                path.display()
            )));
        }

        let test_file = path.join(".tunevault_write_test");
        match fs::write(&test_file, "test") {
            Ok(()) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                return Err(Error::Configuration(format!(
                    "Directory is not writable: {} ({})",
                    path.display(),
                    e
                )));
            }
        }
    } else {
        fs::create_dir_all(path).map_err(|e| {
            Error::Configuration(format!("Cannot create directory {}: {}", path.display(), e))
        })?;
    }

    Ok(())
}
