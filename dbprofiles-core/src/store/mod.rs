//! Durable alias → connection attribute mapping backed by a sectioned file.
//!
//! The store has no business rules beyond the file format: it does not know
//! about connections, and the only uniqueness it enforces is that a section
//! name cannot appear twice.
//!
//! # Durability
//! Every mutation reads the whole file, edits it in memory and writes the
//! whole file back through a temporary file in the same directory that is
//! then renamed over the target. A reader never observes a half-written
//! file. There is no locking: two writers racing on the same path lose
//! updates, last writer wins.

mod document;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    Result,
    error::ProfileError,
    models::{ConnectionAttributes, DRIVERNAME_KEY, StoredProfile},
};
use document::{ConfigDocument, Section};

/// Connection profiles persisted in a sectioned key/value file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for `path`. Nothing is read or created yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads every stored profile in file order.
    ///
    /// A missing or empty file yields an empty list.
    ///
    /// # Errors
    /// Returns a storage error if the file cannot be read, or a malformed
    /// configuration error if it cannot be parsed or a section has no
    /// `drivername`.
    pub fn read_all(&self) -> Result<Vec<StoredProfile>> {
        let document = self.load()?;
        document.sections().iter().map(to_profile).collect()
    }

    /// Reads one stored profile.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if `alias` has no section.
    pub fn read_profile(&self, alias: &str) -> Result<StoredProfile> {
        let document = self.load()?;
        let section = document
            .section(alias)
            .ok_or_else(|| ProfileError::section_not_found(alias))?;
        to_profile(section)
    }

    /// True iff a section named `alias` is stored.
    pub fn contains(&self, alias: &str) -> Result<bool> {
        Ok(self.load()?.contains(alias))
    }

    /// Appends a new section for `alias`. Empty attributes are omitted.
    ///
    /// # Errors
    /// Returns a validation error if a value could not be read back as
    /// written, `DuplicateAlias` if the section already exists, or a storage
    /// error if the file or its parent directory cannot be written.
    pub fn write_profile(&self, alias: &str, attributes: &ConnectionAttributes) -> Result<()> {
        attributes.validate()?;
        let mut document = self.load()?;
        if document.contains(alias) {
            return Err(ProfileError::DuplicateAlias {
                alias: alias.to_string(),
            });
        }
        document.append(alias, &attributes.to_pairs());
        self.persist(&document)?;
        debug!(alias, path = %self.path.display(), "Appended connection profile");
        Ok(())
    }

    /// Writes `new_alias` in a single rewrite, removing `old_alias` first.
    ///
    /// When `old_alias` names a stored section the new section takes its
    /// place in the file; otherwise the new section is appended.
    ///
    /// # Errors
    /// Returns a validation error for values that could not be read back,
    /// `DuplicateAlias` if `new_alias` already exists as a section other
    /// than `old_alias`, or a storage error on write failure.
    pub fn replace_profile(
        &self,
        old_alias: Option<&str>,
        new_alias: &str,
        attributes: &ConnectionAttributes,
    ) -> Result<()> {
        attributes.validate()?;
        let mut document = self.load()?;
        let pairs = attributes.to_pairs();

        if old_alias != Some(new_alias) && document.contains(new_alias) {
            return Err(ProfileError::DuplicateAlias {
                alias: new_alias.to_string(),
            });
        }
        match old_alias {
            Some(old) => document.replace(old, new_alias, &pairs),
            None => document.append(new_alias, &pairs),
        }
        self.persist(&document)?;
        debug!(
            old_alias = old_alias.unwrap_or_default(),
            new_alias,
            path = %self.path.display(),
            "Replaced connection profile"
        );
        Ok(())
    }

    /// Removes the section for `alias`.
    ///
    /// # Errors
    /// Returns `SectionNotFound` if `alias` is not stored; the file is left
    /// untouched in that case.
    pub fn delete_profile(&self, alias: &str) -> Result<()> {
        let mut document = self.load()?;
        if !document.remove(alias) {
            return Err(ProfileError::section_not_found(alias));
        }
        self.persist(&document)?;
        debug!(alias, path = %self.path.display(), "Deleted connection profile");
        Ok(())
    }

    fn load(&self) -> Result<ConfigDocument> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => ConfigDocument::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigDocument::default()),
            Err(e) => Err(ProfileError::storage(
                format!("Failed to read {}", self.path.display()),
                e,
            )),
        }
    }

    fn persist(&self, document: &ConfigDocument) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| {
            ProfileError::storage(
                format!("Failed to create directory {}", parent.display()),
                e,
            )
        })?;

        let write_context = || format!("Failed to write {}", self.path.display());
        let mut temp =
            NamedTempFile::new_in(parent).map_err(|e| ProfileError::storage(write_context(), e))?;
        temp.write_all(document.render().as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| ProfileError::storage(write_context(), e))?;
        temp.persist(&self.path)
            .map_err(|e| ProfileError::storage(write_context(), e.error))?;
        Ok(())
    }
}

fn to_profile(section: &Section) -> Result<StoredProfile> {
    let driver = section.get(DRIVERNAME_KEY).ok_or_else(|| {
        ProfileError::malformed(
            section.line,
            format!("section '{}' has no {}", section.name, DRIVERNAME_KEY),
        )
    })?;

    Ok(StoredProfile {
        name: section.name.clone(),
        driver: driver.to_string(),
        attributes: section
            .entries
            .iter()
            .filter(|(key, _)| key != DRIVERNAME_KEY)
            .cloned()
            .collect(),
    })
}
