//! Manager configuration: where profiles live and how connections are opened.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Result, error::ProfileError, registry::RegistryConfig};

/// File name used when no path is configured, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "connections.ini";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "DBPROFILES_CONFIG";

/// Settings for a [`ConnectorManager`](crate::manager::ConnectorManager).
///
/// # Example
/// ```rust
/// use dbprofiles_core::config::ManagerConfig;
///
/// let config = ManagerConfig::default().with_config_path("/tmp/profiles.ini");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Path of the sectioned profile file
    pub config_path: PathBuf,
    /// Settings for live connections
    pub registry: RegistryConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            registry: RegistryConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Default configuration with the path taken from `DBPROFILES_CONFIG`
    /// when that variable is set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            config.config_path = PathBuf::from(path);
        }
        config
    }

    /// Builder method to set the configuration file path.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Builder method to set the registry settings.
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a validation error for an empty path, a path naming an
    /// existing directory, or invalid registry settings.
    pub fn validate(&self) -> Result<()> {
        if self.config_path.as_os_str().is_empty() {
            return Err(ProfileError::validation(
                "Configuration file path cannot be empty",
            ));
        }
        if self.config_path.is_dir() {
            return Err(ProfileError::validation(format!(
                "Configuration file path {} is a directory",
                self.config_path.display()
            )));
        }
        self.registry.validate()
    }
}
