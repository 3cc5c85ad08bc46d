//! sqlx-backed connection registry.
//!
//! One pool per alias. Each backend is compiled in only when its feature is
//! enabled; drivers without a compiled backend are reported as unsupported
//! rather than failing at link time.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Backend, ConnectionRegistry, RegistryConfig, detect_backend, driver_of};
use crate::{Result, error::ProfileError};

/// A live pool for one backend.
#[derive(Debug)]
enum LivePool {
    #[cfg(feature = "postgresql")]
    Postgres(sqlx::PgPool),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqlitePool),
}

impl LivePool {
    async fn close(&self) {
        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres(pool) => pool.close().await,
            #[cfg(feature = "mysql")]
            Self::MySql(pool) => pool.close().await,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => pool.close().await,
        }
    }

    const fn backend(&self) -> Backend {
        match self {
            #[cfg(feature = "postgresql")]
            Self::Postgres(_) => Backend::Postgres,
            #[cfg(feature = "mysql")]
            Self::MySql(_) => Backend::MySql,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => Backend::Sqlite,
        }
    }
}

/// Connection registry holding one sqlx pool per alias.
///
/// # Example
/// ```rust,no_run
/// use dbprofiles_core::registry::{ConnectionRegistry, RegistryConfig, SqlxRegistry};
///
/// # async fn example() -> dbprofiles_core::Result<()> {
/// let mut registry = SqlxRegistry::new(RegistryConfig::default())?;
/// registry.connect("scratch", "sqlite://").await?;
/// assert!(registry.is_connected("scratch"));
/// registry.close_all().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqlxRegistry {
    config: RegistryConfig,
    connections: BTreeMap<String, LivePool>,
}

impl SqlxRegistry {
    /// Creates an empty registry.
    ///
    /// # Errors
    /// Returns a validation error if `config` is invalid.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connections: BTreeMap::new(),
        })
    }

    /// Settings used for new connections.
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Backend of the connection registered under `alias`.
    pub fn backend_of(&self, alias: &str) -> Option<Backend> {
        self.connections.get(alias).map(LivePool::backend)
    }

    /// Returns the SQLite pool registered under `alias`.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_pool(&self, alias: &str) -> Option<&sqlx::SqlitePool> {
        match self.connections.get(alias)? {
            LivePool::Sqlite(pool) => Some(pool),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Returns the PostgreSQL pool registered under `alias`.
    #[cfg(feature = "postgresql")]
    pub fn postgres_pool(&self, alias: &str) -> Option<&sqlx::PgPool> {
        match self.connections.get(alias)? {
            LivePool::Postgres(pool) => Some(pool),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Returns the MySQL pool registered under `alias`.
    #[cfg(feature = "mysql")]
    pub fn mysql_pool(&self, alias: &str) -> Option<&sqlx::MySqlPool> {
        match self.connections.get(alias)? {
            LivePool::MySql(pool) => Some(pool),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    async fn open(&self, alias: &str, connection_string: &str, backend: Backend) -> Result<LivePool> {
        let url = backend.native_url(connection_string);
        let fail = |e: sqlx::Error| {
            ProfileError::connection_failed_as(alias, connection_string, sqlx_error_name(&e), e)
        };
        debug!(alias, %backend, "Opening connection pool");

        match backend {
            #[cfg(feature = "postgresql")]
            Backend::Postgres => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(self.config.connect_timeout)
                    .connect(&url)
                    .await
                    .map_err(fail)?;
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .map_err(fail)?;
                Ok(LivePool::Postgres(pool))
            }
            #[cfg(feature = "mysql")]
            Backend::MySql => {
                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(self.config.connect_timeout)
                    .connect(&url)
                    .await
                    .map_err(fail)?;
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .map_err(fail)?;
                Ok(LivePool::MySql(pool))
            }
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => {
                use std::str::FromStr;

                let options = sqlx::sqlite::SqliteConnectOptions::from_str(&url)
                    .map_err(fail)?
                    .create_if_missing(true);
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(self.config.connect_timeout)
                    .connect_with(options)
                    .await
                    .map_err(fail)?;
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .map_err(fail)?;
                Ok(LivePool::Sqlite(pool))
            }
            #[allow(unreachable_patterns)]
            _ => Err(ProfileError::UnsupportedDriver {
                driver: driver_of(connection_string).to_string(),
            }),
        }
    }
}

#[async_trait]
impl ConnectionRegistry for SqlxRegistry {
    async fn connect(&mut self, alias: &str, connection_string: &str) -> Result<()> {
        let backend =
            detect_backend(connection_string).ok_or_else(|| ProfileError::UnsupportedDriver {
                driver: driver_of(connection_string).to_string(),
            })?;

        let pool = self.open(alias, connection_string, backend).await?;
        if let Some(previous) = self.connections.insert(alias.to_string(), pool) {
            previous.close().await;
            debug!(alias, "Closed replaced connection");
        }
        info!(alias, %backend, "Connected");
        Ok(())
    }

    fn is_connected(&self, alias: &str) -> bool {
        self.connections.contains_key(alias)
    }

    fn aliases(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    async fn close_all(&mut self) {
        for (alias, pool) in std::mem::take(&mut self.connections) {
            pool.close().await;
            debug!(alias = %alias, "Closed connection");
        }
    }
}

/// Variant name of a sqlx error, used as the user-facing error type.
fn sqlx_error_name(error: &sqlx::Error) -> &'static str {
    match error {
        sqlx::Error::Configuration(_) => "ConfigurationError",
        sqlx::Error::Database(_) => "DatabaseError",
        sqlx::Error::Io(_) => "IoError",
        sqlx::Error::Tls(_) => "TlsError",
        sqlx::Error::Protocol(_) => "ProtocolError",
        sqlx::Error::PoolTimedOut => "PoolTimedOut",
        sqlx::Error::PoolClosed => "PoolClosed",
        _ => "SqlxError",
    }
}
