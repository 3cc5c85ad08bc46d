//! Message protocol between a presentation layer and the connector manager.
//!
//! Incoming messages are JSON objects of the form
//! `{"method": "<name>", "data": {...}}` and decode into a closed [`Intent`]
//! enum. Each intent produces one or more [`Response`] messages of the form
//! `{"method": "<name>", "message": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    Result,
    error::ProfileError,
    manager::{ConnectorManager, SaveRequest},
    models::StoredProfile,
    registry::ConnectionRegistry,
};

/// A decoded request from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// List stored profiles
    ListConnections,
    /// Report whether the profile file exists
    CheckConfigFile,
    /// Connect a stored profile
    Connect {
        /// Alias of the stored profile
        name: String,
    },
    /// Save a submitted profile, connecting to it first unless the form
    /// opts out
    SubmitNewConnection(SaveRequest),
    /// Delete a stored profile
    DeleteConnection {
        /// Alias of the stored profile
        name: String,
    },
}

#[derive(Deserialize)]
struct NamedPayload {
    name: String,
}

impl Intent {
    /// Method name of this intent on the wire.
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ListConnections => "list_connections",
            Self::CheckConfigFile => "check_config_file",
            Self::Connect { .. } => "connect",
            Self::SubmitNewConnection(_) => "submit_new_connection",
            Self::DeleteConnection { .. } => "delete_connection",
        }
    }

    /// Decodes an intent message.
    ///
    /// # Errors
    /// Returns a protocol error when `method` is missing or unknown, or when
    /// `data` does not match the method's payload.
    ///
    /// # Example
    /// ```rust
    /// use dbprofiles_core::intent::Intent;
    /// use serde_json::json;
    ///
    /// let intent = Intent::from_message(&json!({"method": "connect", "data": {"name": "duck"}}))?;
    /// assert_eq!(intent, Intent::Connect { name: "duck".to_string() });
    /// # Ok::<(), dbprofiles_core::ProfileError>(())
    /// ```
    pub fn from_message(message: &Value) -> Result<Self> {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ProfileError::protocol("Method is not specified"))?;
        let data = message.get("data").cloned().unwrap_or(Value::Null);

        match method {
            "list_connections" => Ok(Self::ListConnections),
            "check_config_file" => Ok(Self::CheckConfigFile),
            "connect" => {
                let payload: NamedPayload = decode(method, data)?;
                Ok(Self::Connect { name: payload.name })
            }
            "submit_new_connection" => Ok(Self::SubmitNewConnection(decode(method, data)?)),
            "delete_connection" => {
                let payload: NamedPayload = decode(method, data)?;
                Ok(Self::DeleteConnection { name: payload.name })
            }
            other => Err(ProfileError::protocol(format!(
                "Method {} is not supported",
                other
            ))),
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(method: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| ProfileError::protocol(format!("Invalid data for {}: {}", method, e)))
}

/// A message sent back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "message", rename_all = "snake_case")]
pub enum Response {
    /// Current stored profiles
    UpdateConnections(Vec<StoredProfile>),
    /// Whether the profile file exists
    CheckConfigFile(bool),
    /// Alias that is now connected
    Connected(String),
    /// Alias saved without a connection attempt
    Saved(String),
    /// Alias that was deleted
    Deleted(String),
    /// Alias that is already taken
    ConnectionNameExistsError(String),
    /// `"<ErrorType>: <message>"`
    ConnectionError(String),
}

impl Response {
    /// Error response for a failed intent.
    pub fn from_error(error: &ProfileError) -> Self {
        match error {
            ProfileError::DuplicateAlias { alias } => {
                Self::ConnectionNameExistsError(alias.clone())
            }
            other => Self::ConnectionError(other.display_for_user()),
        }
    }

    /// Serializes the response as a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn update_connections<R: ConnectionRegistry>(manager: &ConnectorManager<R>) -> Response {
    match manager.list_profiles() {
        Ok(profiles) => Response::UpdateConnections(profiles),
        Err(e) => Response::from_error(&e),
    }
}

/// Runs one intent against the manager and returns the responses to send,
/// in order.
pub async fn dispatch<R: ConnectionRegistry>(
    manager: &mut ConnectorManager<R>,
    intent: Intent,
) -> Vec<Response> {
    debug!(method = intent.method(), "Dispatching intent");
    match intent {
        Intent::ListConnections => vec![update_connections(manager)],
        Intent::CheckConfigFile => vec![Response::CheckConfigFile(manager.config_file_present())],
        Intent::Connect { name } => match manager.connect_existing(&name).await {
            Ok(()) => vec![Response::Connected(name)],
            Err(e) => {
                warn!(alias = %name, error = %e, "Connect intent failed");
                vec![Response::ConnectionError(e.display_for_user())]
            }
        },
        Intent::SubmitNewConnection(request) => {
            let options = request.options();
            match manager.save_and_connect(&request, options).await {
                Ok(alias) => {
                    let done = if options.attempt_connection {
                        Response::Connected(alias)
                    } else {
                        Response::Saved(alias)
                    };
                    vec![update_connections(manager), done]
                }
                Err(e) => {
                    warn!(alias = %request.connection_name, error = %e, "Submit intent failed");
                    vec![Response::from_error(&e)]
                }
            }
        }
        Intent::DeleteConnection { name } => match manager.delete_profile(&name) {
            Ok(()) => vec![Response::Deleted(name), update_connections(manager)],
            Err(e) => {
                warn!(alias = %name, error = %e, "Delete intent failed");
                vec![Response::ConnectionError(e.display_for_user())]
            }
        },
    }
}

/// Decodes and dispatches a raw message. Undecodable messages produce a
/// single `connection_error` response.
pub async fn handle_message<R: ConnectionRegistry>(
    manager: &mut ConnectorManager<R>,
    message: &Value,
) -> Vec<Response> {
    match Intent::from_message(message) {
        Ok(intent) => dispatch(manager, intent).await,
        Err(e) => {
            warn!(error = %e, "Rejected intent message");
            vec![Response::from_error(&e)]
        }
    }
}
