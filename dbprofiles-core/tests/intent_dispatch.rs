//! Integration tests for intent messages driving the connector manager.

#![allow(clippy::unwrap_used)]

mod common;

use common::{RecordingRegistry, Workspace};
use dbprofiles_core::{Response, intent::handle_message};
use serde_json::{Value, json};

fn wire(responses: &[Response]) -> Vec<Value> {
    responses
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect()
}

#[tokio::test]
async fn test_integration_check_config_file() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(&mut manager, &json!({"method": "check_config_file"})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({"method": "check_config_file", "message": false})]
    );

    workspace.write("");
    let responses = handle_message(&mut manager, &json!({"method": "check_config_file"})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({"method": "check_config_file", "message": true})]
    );
}

#[tokio::test]
async fn test_integration_submit_connects_and_updates_list() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(
        &mut manager,
        &json!({
            "method": "submit_new_connection",
            "data": {"connectionName": "mydb", "driver": "sqlite", "database": "my.db"}
        }),
    )
    .await;

    assert_eq!(
        wire(&responses),
        vec![
            json!({
                "method": "update_connections",
                "message": [{"name": "mydb", "driver": "sqlite", "database": "my.db"}]
            }),
            json!({"method": "connected", "message": "mydb"}),
        ]
    );
}

#[tokio::test]
async fn test_integration_submit_without_connection_attempt() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::refusing());

    let responses = handle_message(
        &mut manager,
        &json!({
            "method": "submit_new_connection",
            "data": {
                "connectionName": "duck",
                "driver": "duckdb",
                "database": "my.duckdb",
                "attemptConnection": false
            }
        }),
    )
    .await;

    assert_eq!(
        wire(&responses),
        vec![
            json!({
                "method": "update_connections",
                "message": [{"name": "duck", "driver": "duckdb", "database": "my.duckdb"}]
            }),
            json!({"method": "saved", "message": "duck"}),
        ]
    );
    assert!(manager.registry().attempts.is_empty());
    assert_eq!(
        workspace.read(),
        "[duck]\ndatabase = my.duckdb\ndrivername = duckdb\n\n"
    );
}

#[tokio::test]
async fn test_integration_submit_multiline_password_is_rejected() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(
        &mut manager,
        &json!({
            "method": "submit_new_connection",
            "data": {"connectionName": "pg", "driver": "postgresql", "password": "line1\n\nline3"}
        }),
    )
    .await;

    assert_eq!(
        wire(&responses),
        vec![json!({
            "method": "connection_error",
            "message": "ValidationError: Attribute password must not contain line breaks"
        })]
    );
    assert!(manager.registry().attempts.is_empty());
    assert!(!manager.config_file_present());

    let responses = handle_message(&mut manager, &json!({"method": "list_connections"})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({"method": "update_connections", "message": []})]
    );
}

#[tokio::test]
async fn test_integration_submit_duplicate_name() {
    let workspace = Workspace::new();
    workspace.write("[duck]\ndrivername = duckdb\n\n");
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(
        &mut manager,
        &json!({
            "method": "submit_new_connection",
            "data": {"connectionName": "duck", "driver": "duckdb"}
        }),
    )
    .await;

    assert_eq!(
        wire(&responses),
        vec![json!({"method": "connection_name_exists_error", "message": "duck"})]
    );
    assert!(manager.registry().attempts.is_empty());
}

#[tokio::test]
async fn test_integration_submit_refused_reports_error_type() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::refusing());

    let responses = handle_message(
        &mut manager,
        &json!({
            "method": "submit_new_connection",
            "data": {
                "connectionName": "pg",
                "driver": "postgresql",
                "host": "localhost",
                "port": 5432
            }
        }),
    )
    .await;

    assert_eq!(
        wire(&responses),
        vec![json!({
            "method": "connection_error",
            "message": "OperationalError: could not connect to server: Connection refused"
        })]
    );
    assert!(!manager.config_file_present());
}

#[tokio::test]
async fn test_integration_connect_and_delete() {
    let workspace = Workspace::new();
    workspace.write("[duck]\ndrivername = duckdb\n\n[sqlite]\ndrivername = sqlite\n\n");
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(
        &mut manager,
        &json!({"method": "connect", "data": {"name": "sqlite"}}),
    )
    .await;
    assert_eq!(
        wire(&responses),
        vec![json!({"method": "connected", "message": "sqlite"})]
    );

    let responses = handle_message(
        &mut manager,
        &json!({"method": "delete_connection", "data": {"name": "duck"}}),
    )
    .await;
    assert_eq!(
        wire(&responses),
        vec![
            json!({"method": "deleted", "message": "duck"}),
            json!({
                "method": "update_connections",
                "message": [{"name": "sqlite", "driver": "sqlite"}]
            }),
        ]
    );
}

#[tokio::test]
async fn test_integration_delete_unknown_alias() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(
        &mut manager,
        &json!({"method": "delete_connection", "data": {"name": "ghost"}}),
    )
    .await;
    assert_eq!(
        wire(&responses),
        vec![json!({
            "method": "connection_error",
            "message": "SectionNotFoundError: No section: 'ghost'"
        })]
    );
}

#[tokio::test]
async fn test_integration_protocol_errors() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(&mut manager, &json!({"data": {}})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({
            "method": "connection_error",
            "message": "ProtocolError: Method is not specified"
        })]
    );

    let responses = handle_message(&mut manager, &json!({"method": "upload"})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({
            "method": "connection_error",
            "message": "ProtocolError: Method upload is not supported"
        })]
    );
}

#[tokio::test]
async fn test_integration_list_connections_on_missing_file() {
    let workspace = Workspace::new();
    let mut manager = workspace.manager(RecordingRegistry::default());

    let responses = handle_message(&mut manager, &json!({"method": "list_connections"})).await;
    assert_eq!(
        wire(&responses),
        vec![json!({"method": "update_connections", "message": []})]
    );
}
