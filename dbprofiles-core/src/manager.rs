//! Connector manager: reconciles stored profiles with live connections.
//!
//! The manager is the only place that combines the [`ConfigStore`], the
//! connection string builder and a [`ConnectionRegistry`]. The store says
//! which profiles exist; the registry says what is connected right now.
//! The two are never conflated: deleting a profile leaves its connection
//! open, and a connection may exist without a stored profile.
//!
//! # Failure ordering
//! Every mutating operation fails before touching the file when the failure
//! comes from the registry or from validation. Only the final write can fail
//! on its own, and it is atomic.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    Result,
    builder::build_connection_string,
    config::ManagerConfig,
    models::{ConnectionAttributes, StoredProfile, parse_port, validate_alias},
    registry::ConnectionRegistry,
    store::ConfigStore,
};

/// A submitted create-or-edit form.
///
/// Field names follow the presentation layer's camelCase convention.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// Alias to save the profile under
    pub connection_name: String,
    /// Driver identifier
    pub driver: String,
    /// Database user
    #[serde(default)]
    pub username: Option<String>,
    /// Database password
    #[serde(default)]
    pub password: Option<String>,
    /// Server host
    #[serde(default)]
    pub host: Option<String>,
    /// Database name or file path
    #[serde(default)]
    pub database: Option<String>,
    /// Port as submitted: a number, a numeric string, or nothing
    #[serde(default)]
    pub port: Option<serde_json::Value>,
    /// Alias of the profile being edited, if this is an edit
    #[serde(default)]
    pub existing_connection_alias: Option<String>,
    /// Whether to connect before saving; absent means connect
    #[serde(default)]
    pub attempt_connection: Option<bool>,
}

impl std::fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveRequest")
            .field("connection_name", &self.connection_name)
            .field("driver", &self.driver)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("host", &self.host)
            .field("database", &self.database)
            .field("port", &self.port)
            .field("existing_connection_alias", &self.existing_connection_alias)
            .field("attempt_connection", &self.attempt_connection)
            .finish()
    }
}

impl SaveRequest {
    /// Creates a request for `connection_name` using `driver`.
    pub fn new(connection_name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            connection_name: connection_name.into(),
            driver: driver.into(),
            ..Default::default()
        }
    }

    /// The edited alias, with an empty string treated as absent.
    pub fn existing_alias(&self) -> Option<&str> {
        self.existing_connection_alias
            .as_deref()
            .filter(|alias| !alias.is_empty())
    }

    /// Save options requested by the form.
    pub fn options(&self) -> SaveOptions {
        SaveOptions {
            attempt_connection: self.attempt_connection.unwrap_or(true),
        }
    }

    /// Converts the form fields into connection attributes.
    ///
    /// # Errors
    /// Returns a validation error if the port is not a valid port number or
    /// a value could not be stored unchanged.
    pub fn to_attributes(&self) -> Result<ConnectionAttributes> {
        let mut attributes = ConnectionAttributes::new(self.driver.clone());
        if let Some(username) = &self.username {
            attributes = attributes.with_username(username.as_str());
        }
        if let Some(password) = &self.password {
            attributes = attributes.with_password(password.as_str());
        }
        if let Some(host) = &self.host {
            attributes = attributes.with_host(host.as_str());
        }
        if let Some(database) = &self.database {
            attributes = attributes.with_database(database.as_str());
        }
        if let Some(port) = &self.port {
            attributes.port = parse_port(port)?;
        }
        attributes.validate()?;
        Ok(attributes)
    }
}

/// Options for [`ConnectorManager::save_and_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Connect before persisting; when false the profile is saved unverified
    pub attempt_connection: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            attempt_connection: true,
        }
    }
}

/// Orchestrates profile storage, connection string building and live
/// connections.
///
/// Mutating operations take `&mut self`, so one intent runs to completion
/// before the next one can start.
///
/// # Example
/// ```rust,no_run
/// use dbprofiles_core::{
///     config::ManagerConfig,
///     manager::{ConnectorManager, SaveOptions, SaveRequest},
///     registry::SqlxRegistry,
/// };
///
/// # async fn example() -> dbprofiles_core::Result<()> {
/// let config = ManagerConfig::default();
/// let registry = SqlxRegistry::new(config.registry.clone())?;
/// let mut manager = ConnectorManager::new(&config, registry)?;
///
/// let mut request = SaveRequest::new("scratch", "sqlite");
/// request.database = Some(":memory:".to_string());
/// let alias = manager.save_and_connect(&request, SaveOptions::default()).await?;
/// assert_eq!(alias, "scratch");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectorManager<R> {
    store: ConfigStore,
    registry: R,
}

impl<R: ConnectionRegistry> ConnectorManager<R> {
    /// Creates a manager for the configured profile file.
    ///
    /// # Errors
    /// Returns a validation error if `config` is invalid.
    pub fn new(config: &ManagerConfig, registry: R) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_store(
            ConfigStore::new(config.config_path.clone()),
            registry,
        ))
    }

    /// Creates a manager over an existing store.
    pub const fn with_store(store: ConfigStore, registry: R) -> Self {
        Self { store, registry }
    }

    /// The backing profile store.
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The connection registry.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the connection registry.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Every stored profile, in file order.
    pub fn list_profiles(&self) -> Result<Vec<StoredProfile>> {
        self.store.read_all()
    }

    /// True iff the profile file exists.
    pub fn config_file_present(&self) -> bool {
        self.store.exists()
    }

    /// Connects the stored profile `alias`, replacing any live connection
    /// under that alias. The profile file is never modified.
    ///
    /// # Errors
    /// Returns `SectionNotFound` for an unknown alias, a validation error
    /// for unusable stored attributes, or the registry's error verbatim.
    pub async fn connect_existing(&mut self, alias: &str) -> Result<()> {
        let profile = self.store.read_profile(alias)?;
        let attributes = ConnectionAttributes::from_stored(&profile)?;
        let connection_string = build_connection_string(&attributes)?;

        self.registry.connect(alias, &connection_string).await?;
        info!(alias, driver = %attributes.drivername, "Connected stored profile");
        Ok(())
    }

    /// Saves a submitted profile, connecting to it first.
    ///
    /// 1. Renaming to (or creating) an alias that is already stored fails
    ///    with `DuplicateAlias`. Editing without renaming skips the check.
    /// 2. The connection string is built from the submitted attributes.
    /// 3. Unless disabled, the registry connects under the new alias. A
    ///    failure is returned as-is and nothing is written.
    /// 4. The profile is persisted: an edit replaces the old section in
    ///    one rewrite, a new profile is appended.
    ///
    /// Returns the alias the profile was saved under.
    ///
    /// # Errors
    /// `DuplicateAlias`, `Validation`, the registry's connection error, or a
    /// storage error from the final write.
    pub async fn save_and_connect(
        &mut self,
        request: &SaveRequest,
        options: SaveOptions,
    ) -> Result<String> {
        let new_alias = request.connection_name.as_str();
        let existing_alias = request.existing_alias();
        validate_alias(new_alias)?;

        if existing_alias != Some(new_alias) && self.store.contains(new_alias)? {
            warn!(alias = new_alias, "Rejected duplicate connection alias");
            return Err(crate::error::ProfileError::DuplicateAlias {
                alias: new_alias.to_string(),
            });
        }

        let attributes = request.to_attributes()?;
        let connection_string = build_connection_string(&attributes)?;

        if options.attempt_connection {
            self.registry.connect(new_alias, &connection_string).await?;
        } else {
            debug!(alias = new_alias, "Saving without a connection attempt");
        }

        match existing_alias {
            Some(old_alias) => {
                self.store
                    .replace_profile(Some(old_alias), new_alias, &attributes)?
            }
            None => self.store.write_profile(new_alias, &attributes)?,
        }
        info!(
            alias = new_alias,
            previous = existing_alias.unwrap_or_default(),
            driver = %attributes.drivername,
            "Saved connection profile"
        );
        Ok(new_alias.to_string())
    }

    /// Removes the stored profile `alias`. A live connection under that
    /// alias stays open.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if `alias` is not stored.
    pub fn delete_profile(&mut self, alias: &str) -> Result<()> {
        self.store.delete_profile(alias)?;
        info!(alias, "Deleted connection profile");
        Ok(())
    }

    /// Closes every live connection.
    pub async fn close_all(&mut self) {
        self.registry.close_all().await;
    }
}
