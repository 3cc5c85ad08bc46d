//! Process-wide mapping from alias to live database connection.
//!
//! The connector manager only talks to the [`ConnectionRegistry`] trait; it
//! never assumes a particular engine or an in-process singleton. The
//! bundled [`SqlxRegistry`] backs the trait with sqlx pools for the
//! backends compiled into this build.
//!
//! # Module Structure
//! - `config`: Registry settings (timeouts, pool size)
//! - `pool`: sqlx-backed registry (feature-gated)

use async_trait::async_trait;

use crate::Result;

mod config;

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
mod pool;

pub use config::RegistryConfig;

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub use pool::SqlxRegistry;

/// Store of live, alias-keyed connections.
///
/// Calls are expected to be sequential; implementations need no internal
/// locking beyond what `&mut self` already guarantees.
#[async_trait]
pub trait ConnectionRegistry: Send {
    /// Opens a connection for `connection_string` and registers it as `alias`,
    /// replacing any connection already registered under that alias.
    ///
    /// # Errors
    /// Returns the connectivity layer's error wrapped as
    /// `ProfileError::Connection`, or `ProfileError::UnsupportedDriver`.
    /// A failed attempt leaves any previous connection under `alias` intact.
    async fn connect(&mut self, alias: &str, connection_string: &str) -> Result<()>;

    /// True when a live connection is registered under `alias`.
    fn is_connected(&self, alias: &str) -> bool;

    /// Aliases with a live connection, sorted.
    fn aliases(&self) -> Vec<String>;

    /// Closes and forgets every connection.
    async fn close_all(&mut self);
}

/// Database engine family a driver identifier maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL wire protocol (includes Redshift)
    Postgres,
    /// MySQL wire protocol (includes MariaDB)
    MySql,
    /// Embedded SQLite
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "PostgreSQL"),
            Self::MySql => write!(f, "MySQL"),
            Self::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Driver identifier of a connection string, i.e. everything before `://`.
pub fn driver_of(connection_string: &str) -> &str {
    connection_string
        .split_once("://")
        .map_or(connection_string, |(driver, _)| driver)
}

/// Detects the backend from the driver identifier of a connection string.
///
/// The dialect is the part of the driver before any `+`, so
/// `mysql+pymysql` and `mysql` both map to MySQL.
pub fn detect_backend(connection_string: &str) -> Option<Backend> {
    let driver = driver_of(connection_string);
    let dialect = driver.split('+').next().unwrap_or(driver);
    match dialect {
        "postgresql" | "postgres" | "redshift" => Some(Backend::Postgres),
        "mysql" | "mariadb" => Some(Backend::MySql),
        "sqlite" => Some(Backend::Sqlite),
        _ => None,
    }
}

impl Backend {
    /// Rewrites a dialect connection string into the URL form sqlx expects.
    ///
    /// SQLite paths follow the dialect convention: `sqlite://` and
    /// `sqlite:///:memory:` are in-memory, `sqlite:///rel.db` is relative and
    /// `sqlite:////abs.db` is absolute.
    pub fn native_url(self, connection_string: &str) -> String {
        let rest = connection_string
            .split_once("://")
            .map_or("", |(_, rest)| rest);
        match self {
            Self::Postgres => format!("postgres://{}", rest),
            Self::MySql => format!("mysql://{}", rest),
            Self::Sqlite => {
                let path = rest.strip_prefix('/').unwrap_or(rest);
                if path.is_empty() || path == ":memory:" {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite://{}", path)
                }
            }
        }
    }
}
