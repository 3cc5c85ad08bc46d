//! Core library for managing named database connection profiles.
//!
//! Profiles (alias, driver, host, credentials) are persisted in a sectioned
//! key/value file and turned into live connections on request. The crate is
//! organised leaves first:
//!
//! - [`store`]: the on-disk profile file and its read/write operations
//! - [`builder`]: connection string construction from structured attributes
//! - [`registry`]: alias-keyed live connections behind a trait
//! - [`manager`]: the orchestration core enforcing alias uniqueness and
//!   connect-before-persist ordering
//! - [`intent`]: the JSON message protocol a presentation layer drives
//!
//! # Security
//! - Passwords are held in zeroizing buffers and never logged
//! - Connection strings in errors are redacted
//! - Profiles are stored in plain text; protect the file accordingly
//!
//! # Example
//! ```rust
//! use dbprofiles_core::{ConnectionAttributes, build_connection_string};
//!
//! let attributes = ConnectionAttributes::new("duckdb");
//! assert_eq!(build_connection_string(&attributes)?, "duckdb://");
//! # Ok::<(), dbprofiles_core::ProfileError>(())
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod builder;
pub mod config;
pub mod error;
pub mod intent;
pub mod logging;
pub mod manager;
pub mod models;
pub mod registry;
pub mod store;
pub mod templates;

// Re-export commonly used types
pub use builder::build_connection_string;
pub use config::ManagerConfig;
pub use error::{ProfileError, Result};
pub use intent::{Intent, Response};
pub use logging::init_logging;
pub use manager::{ConnectorManager, SaveOptions, SaveRequest};
pub use models::{ConnectionAttributes, StoredProfile};
pub use registry::{ConnectionRegistry, RegistryConfig};
pub use store::ConfigStore;

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub use registry::SqlxRegistry;
