//! Shared fixtures for connector manager integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use dbprofiles_core::{ConfigStore, ConnectionRegistry, ConnectorManager, ProfileError, Result};
use tempfile::TempDir;

#[derive(Debug, thiserror::Error)]
#[error("could not connect to server: Connection refused")]
pub struct OperationalError;

/// Registry that records every connection attempt and optionally refuses all of them.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pub attempts: Vec<(String, String)>,
    pub connected: BTreeSet<String>,
    pub refuse: bool,
    pub closed: usize,
}

impl RecordingRegistry {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConnectionRegistry for RecordingRegistry {
    async fn connect(&mut self, alias: &str, connection_string: &str) -> Result<()> {
        self.attempts
            .push((alias.to_string(), connection_string.to_string()));
        if self.refuse {
            return Err(ProfileError::connection_failed(
                alias,
                connection_string,
                OperationalError,
            ));
        }
        self.connected.insert(alias.to_string());
        Ok(())
    }

    fn is_connected(&self, alias: &str) -> bool {
        self.connected.contains(alias)
    }

    fn aliases(&self) -> Vec<String> {
        self.connected.iter().cloned().collect()
    }

    async fn close_all(&mut self) {
        self.closed += self.connected.len();
        self.connected.clear();
    }
}

/// A temporary directory holding `connections.ini`.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("connections.ini")
    }

    pub fn write(&self, contents: &str) {
        std::fs::write(self.path(), contents).unwrap();
    }

    pub fn read(&self) -> String {
        std::fs::read_to_string(self.path()).unwrap()
    }

    pub fn manager(&self, registry: RecordingRegistry) -> ConnectorManager<RecordingRegistry> {
        ConnectorManager::with_store(ConfigStore::new(self.path()), registry)
    }
}
