//! Live connection settings for registry implementations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings applied when a registry opens a connection.
///
/// # Example
/// ```rust
/// use dbprofiles_core::registry::RegistryConfig;
/// use std::time::Duration;
///
/// let config = RegistryConfig::default()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_max_connections(2);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,
    /// Maximum number of pooled connections per alias
    pub max_connections: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_connections: 5,
        }
    }
}

impl std::fmt::Display for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RegistryConfig(timeout={}s, max_connections={})",
            self.connect_timeout.as_secs(),
            self.max_connections
        )
    }
}

impl RegistryConfig {
    /// Validates registry settings.
    ///
    /// # Errors
    /// Returns error if a value is zero or the pool size is unreasonably large
    pub fn validate(&self) -> crate::Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(crate::error::ProfileError::validation(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.max_connections == 0 {
            return Err(crate::error::ProfileError::validation(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(crate::error::ProfileError::validation(
                "max_connections should not exceed 100",
            ));
        }

        Ok(())
    }

    /// Builder method to set the connect timeout.
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the pool size.
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}
