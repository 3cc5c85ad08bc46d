//! Connection profile data model.
//!
//! [`ConnectionAttributes`] is what a user submits and what gets persisted;
//! [`StoredProfile`] is what the configuration file hands back when read.

use serde::ser::{Serialize, SerializeMap, Serializer};
use zeroize::Zeroizing;

use crate::{Result, error::ProfileError};

/// Attribute key carrying the driver identifier in a stored section.
pub const DRIVERNAME_KEY: &str = "drivername";

/// Connection attributes for one profile.
///
/// Optional attributes are `None` rather than empty; the `with_*` builders
/// normalize empty strings away so that nothing falsy is ever persisted.
///
/// # Security
/// The password is held in a [`Zeroizing`] container and is omitted from
/// `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionAttributes {
    /// Database user
    pub username: Option<String>,
    /// Database password
    pub password: Option<Zeroizing<String>>,
    /// Server host name or address
    pub host: Option<String>,
    /// Database name, or file path for embedded engines
    pub database: Option<String>,
    /// Driver identifier, e.g. `postgresql` or `mysql+pymysql`
    pub drivername: String,
    /// Server port; never zero
    pub port: Option<u16>,
}

impl std::fmt::Debug for ConnectionAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAttributes")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("host", &self.host)
            .field("database", &self.database)
            .field("drivername", &self.drivername)
            .field("port", &self.port)
            .finish()
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.is_empty() { None } else { Some(value) }
}

impl ConnectionAttributes {
    /// Creates attributes for a driver with every optional field absent.
    pub fn new(drivername: impl Into<String>) -> Self {
        Self {
            drivername: drivername.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_empty(username);
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = non_empty(password).map(Zeroizing::new);
        self
    }

    /// Builder method to set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = non_empty(host);
        self
    }

    /// Builder method to set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = non_empty(database);
        self
    }

    /// Builder method to set the port. Zero is treated as absent.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = (port != 0).then_some(port);
        self
    }

    /// Returns the password without exposing it beyond the borrow.
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }

    /// Non-empty attributes in persistence order:
    /// username, password, host, database, drivername, port.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(username) = &self.username {
            pairs.push(("username", username.clone()));
        }
        if let Some(password) = self.password() {
            pairs.push(("password", password.to_string()));
        }
        if let Some(host) = &self.host {
            pairs.push(("host", host.clone()));
        }
        if let Some(database) = &self.database {
            pairs.push(("database", database.clone()));
        }
        if !self.drivername.is_empty() {
            pairs.push((DRIVERNAME_KEY, self.drivername.clone()));
        }
        if let Some(port) = self.port {
            pairs.push(("port", port.to_string()));
        }
        pairs
    }

    /// Checks that every value survives being written to and read back from
    /// the configuration file unchanged.
    ///
    /// # Errors
    /// Returns a validation error naming the first attribute that contains a
    /// line break or starts or ends with whitespace.
    pub fn validate(&self) -> Result<()> {
        self.to_pairs()
            .iter()
            .try_for_each(|(key, value)| validate_value(key, value))
    }

    /// Reconstructs attributes from a stored profile.
    ///
    /// # Errors
    /// Returns a validation error if the stored port is not a valid port.
    pub fn from_stored(profile: &StoredProfile) -> Result<Self> {
        let mut attributes = Self::new(profile.driver.clone());
        if let Some(username) = profile.get("username") {
            attributes = attributes.with_username(username);
        }
        if let Some(password) = profile.get("password") {
            attributes = attributes.with_password(password);
        }
        if let Some(host) = profile.get("host") {
            attributes = attributes.with_host(host);
        }
        if let Some(database) = profile.get("database") {
            attributes = attributes.with_database(database);
        }
        if let Some(port) = profile.get("port") {
            attributes.port = parse_port_str(port)?;
        }
        Ok(attributes)
    }
}

/// A profile as read back from the configuration file.
///
/// Serializes to a flat object: `{"name": .., "driver": .., <other keys>..}`
/// with the other keys in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    /// Section name, i.e. the alias
    pub name: String,
    /// Value of the `drivername` key
    pub driver: String,
    /// Every other key of the section, verbatim and in file order
    pub attributes: Vec<(String, String)>,
}

impl StoredProfile {
    /// Looks up a pass-through attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for StoredProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 2))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("driver", &self.driver)?;
        for (key, value) in &self.attributes {
            if key != "name" && key != "driver" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Parses a port supplied as text. Empty and `0` mean "no port".
///
/// # Errors
/// Returns a validation error for non-numeric, negative or out-of-range input.
pub fn parse_port_str(raw: &str) -> Result<Option<u16>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ProfileError::validation(format!("Port must be a number, got '{}'", raw)))?;
    port_from_i64(value)
}

/// Parses a port supplied as a JSON value (number, numeric string or null).
///
/// # Errors
/// Returns a validation error for anything that is not a whole number in
/// `0..=65535`.
pub fn parse_port(value: &serde_json::Value) -> Result<Option<u16>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(raw) => parse_port_str(raw),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(value) => port_from_i64(value),
            None => Err(ProfileError::validation(format!(
                "Port must be a whole number, got {}",
                number
            ))),
        },
        other => Err(ProfileError::validation(format!(
            "Port must be a number, got {}",
            other
        ))),
    }
}

fn port_from_i64(value: i64) -> Result<Option<u16>> {
    if value < 0 {
        return Err(ProfileError::validation(format!(
            "Port must not be negative, got {}",
            value
        )));
    }
    let port = u16::try_from(value).map_err(|_| {
        ProfileError::validation(format!("Port must be at most 65535, got {}", value))
    })?;
    Ok((port != 0).then_some(port))
}

/// Checks that an alias can be used as a section name.
///
/// # Errors
/// Returns a validation error for empty aliases, surrounding whitespace,
/// brackets or line breaks.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(ProfileError::validation("Connection alias cannot be empty"));
    }
    if alias.trim() != alias {
        return Err(ProfileError::validation(format!(
            "Connection alias '{}' must not start or end with whitespace",
            alias
        )));
    }
    if alias.contains(['[', ']', '\n', '\r']) {
        return Err(ProfileError::validation(format!(
            "Connection alias '{}' must not contain brackets or line breaks",
            alias.escape_debug()
        )));
    }
    Ok(())
}

/// Checks a single attribute value. The password is never echoed back.
///
/// # Errors
/// Returns a validation error for line breaks or surrounding whitespace.
pub fn validate_value(key: &str, value: &str) -> Result<()> {
    let shown = if key == "password" {
        String::new()
    } else {
        format!(" '{}'", value.escape_debug())
    };
    if value.contains(['\n', '\r']) {
        return Err(ProfileError::validation(format!(
            "Attribute {}{} must not contain line breaks",
            key, shown
        )));
    }
    if value.trim() != value {
        return Err(ProfileError::validation(format!(
            "Attribute {}{} must not start or end with whitespace",
            key, shown
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders_drop_empty_values() {
        let attributes = ConnectionAttributes::new("duckdb")
            .with_username("")
            .with_password("")
            .with_host("")
            .with_database("")
            .with_port(0);

        assert_eq!(attributes, ConnectionAttributes::new("duckdb"));
        assert_eq!(attributes.to_pairs(), vec![("drivername", "duckdb".to_string())]);
    }

    #[test]
    fn test_to_pairs_order() {
        let attributes = ConnectionAttributes::new("postgresql")
            .with_port(5432)
            .with_database("db")
            .with_host("db.corp.com")
            .with_password("pass")
            .with_username("user");

        let keys: Vec<&str> = attributes.to_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            ["username", "password", "host", "database", "drivername", "port"]
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let attributes = ConnectionAttributes::new("postgresql").with_password("s3cr3t");
        let debug = format!("{:?}", attributes);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port(&json!(5432)).unwrap(), Some(5432));
        assert_eq!(parse_port(&json!("3306")).unwrap(), Some(3306));
        assert_eq!(parse_port(&json!(" 443 ")).unwrap(), Some(443));
        assert_eq!(parse_port(&json!("")).unwrap(), None);
        assert_eq!(parse_port(&json!(null)).unwrap(), None);
        assert_eq!(parse_port(&json!(0)).unwrap(), None);

        assert!(parse_port(&json!("abc")).is_err());
        assert!(parse_port(&json!(-1)).is_err());
        assert!(parse_port(&json!("-5432")).is_err());
        assert!(parse_port(&json!(70000)).is_err());
        assert!(parse_port(&json!(54.32)).is_err());
        assert!(parse_port(&json!(true)).is_err());
    }

    #[test]
    fn test_validate_alias() {
        assert!(validate_alias("duck").is_ok());
        assert!(validate_alias("my db").is_ok());
        assert!(validate_alias("").is_err());
        assert!(validate_alias(" duck").is_err());
        assert!(validate_alias("a]b").is_err());
        assert!(validate_alias("a\nb").is_err());
    }

    #[test]
    fn test_validate_rejects_values_the_file_cannot_hold() {
        let ok = ConnectionAttributes::new("postgresql")
            .with_username("user")
            .with_password("p%41ss=#;[x]")
            .with_host("db.corp.com");
        assert!(ok.validate().is_ok());

        let blank_line = ConnectionAttributes::new("postgresql").with_password("line1\n\nline3");
        let error = blank_line.validate().unwrap_err();
        assert!(matches!(error, ProfileError::Validation { .. }));
        assert!(!error.to_string().contains("line1"));

        let carriage = ConnectionAttributes::new("sqlite").with_database("a\rb");
        assert!(carriage.validate().is_err());

        let padded = ConnectionAttributes::new("postgresql").with_password("  secret ");
        let error = padded.validate().unwrap_err();
        assert!(error.to_string().contains("whitespace"));
        assert!(!error.to_string().contains("secret"));

        assert!(ConnectionAttributes::new("postgresql")
            .with_host("localhost ")
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_stored_round_trip() {
        let profile = StoredProfile {
            name: "pg".to_string(),
            driver: "postgresql".to_string(),
            attributes: vec![
                ("username".to_string(), "user".to_string()),
                ("host".to_string(), "localhost".to_string()),
                ("port".to_string(), "5432".to_string()),
            ],
        };

        let attributes = ConnectionAttributes::from_stored(&profile).unwrap();
        assert_eq!(attributes.username.as_deref(), Some("user"));
        assert_eq!(attributes.host.as_deref(), Some("localhost"));
        assert_eq!(attributes.port, Some(5432));
        assert_eq!(attributes.password(), None);
    }

    #[test]
    fn test_from_stored_rejects_bad_port() {
        let profile = StoredProfile {
            name: "pg".to_string(),
            driver: "postgresql".to_string(),
            attributes: vec![("port".to_string(), "five".to_string())],
        };
        assert!(matches!(
            ConnectionAttributes::from_stored(&profile),
            Err(ProfileError::Validation { .. })
        ));
    }

    #[test]
    fn test_stored_profile_serializes_flat_in_order() {
        let profile = StoredProfile {
            name: "mydb".to_string(),
            driver: "sqlite".to_string(),
            attributes: vec![("database".to_string(), "my.db".to_string())],
        };

        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(
            json,
            r#"{"name":"mydb","driver":"sqlite","database":"my.db"}"#
        );
    }
}
