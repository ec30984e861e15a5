//! Project-scoped note access
//!
//! [`Notebook`] is the entry point the routes use. It maps project names to
//! note documents, parses identifiers with the configured strictness, and
//! runs every write under the project's lock so that concurrent writers to
//! one project never lose each other's changes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ScribeConfig;
use crate::error::{Result, ScribeError, StorageError};
use crate::hierarchy::TypeHierarchy;
use crate::identifier::Identifier;
use crate::locks::ProjectLocks;
use crate::note::{Node, Note};
use crate::persistence::{Backup, LocalBackup, NoBackup};
use crate::project::ProjectName;
use crate::store::{LocatedNote, NoteStore};

/// Note documents for every project under one directory
pub struct Notebook {
    notes_dir: PathBuf,
    hierarchy: Arc<TypeHierarchy>,
    backup: Arc<dyn Backup>,
    locks: ProjectLocks,
    strict_identifiers: bool,
}

impl Notebook {
    pub fn new(
        notes_dir: impl Into<PathBuf>,
        hierarchy: Arc<TypeHierarchy>,
        backup: Arc<dyn Backup>,
    ) -> Self {
        Self {
            notes_dir: notes_dir.into(),
            hierarchy,
            backup,
            locks: ProjectLocks::new(),
            strict_identifiers: false,
        }
    }

    /// Build from configuration with an already-loaded hierarchy
    pub fn from_config(config: &ScribeConfig, hierarchy: Arc<TypeHierarchy>) -> Self {
        let backup: Arc<dyn Backup> = if config.backups.enabled {
            Arc::new(LocalBackup::in_directory(config.paths.notes_backups_dir()))
        } else {
            Arc::new(NoBackup)
        };
        Self::new(config.paths.notes_dir(), hierarchy, backup)
            .with_strict_identifiers(config.identifiers.strict)
    }

    pub fn with_strict_identifiers(mut self, strict: bool) -> Self {
        self.strict_identifiers = strict;
        self
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn document_path(&self, project: &ProjectName) -> PathBuf {
        self.notes_dir.join(project.file_name("json"))
    }

    pub fn parse_identifier(&self, raw: &str) -> Result<Identifier> {
        Ok(Identifier::parse_with(raw, self.strict_identifiers)?)
    }

    /// Add a note; the project's document is created if needed
    pub fn add_note(
        &self,
        project: &ProjectName,
        identifier: &str,
        content: &str,
        caller_key: &str,
    ) -> Result<String> {
        let identifier = self.parse_identifier(identifier)?;
        self.locks.with_lock(project.as_str(), || {
            let mut store = NoteStore::open_or_create(
                self.document_path(project),
                Arc::clone(&self.hierarchy),
                Arc::clone(&self.backup),
            )?;
            store.add_note(&identifier, content, caller_key)
        })
    }

    /// Update a note; `Ok(false)` if it does not exist
    pub fn update_note(
        &self,
        project: &ProjectName,
        note_id: &str,
        identifier: &str,
        updates: &Map<String, Value>,
    ) -> Result<bool> {
        let identifier = self.parse_identifier(identifier)?;
        self.locks.with_lock(project.as_str(), || {
            match self.open_existing(project)? {
                Some(mut store) => store.update_note(note_id, &identifier, updates),
                None => Ok(false),
            }
        })
    }

    /// Delete a note; `Ok(false)` if it does not exist
    pub fn delete_note(
        &self,
        project: &ProjectName,
        note_id: &str,
        identifier: &str,
    ) -> Result<bool> {
        let identifier = self.parse_identifier(identifier)?;
        self.locks.with_lock(project.as_str(), || {
            match self.open_existing(project)? {
                Some(mut store) => store.delete_note(note_id, &identifier),
                None => Ok(false),
            }
        })
    }

    /// A single note, if the project, node and note all exist
    pub fn get_note(
        &self,
        project: &ProjectName,
        note_id: &str,
        identifier: &str,
    ) -> Result<Option<Note>> {
        let identifier = self.parse_identifier(identifier)?;
        Ok(self
            .open_existing(project)?
            .and_then(|store| store.get_note_by_id(note_id, &identifier).cloned()))
    }

    /// All notes at or under a node, if the project and node exist
    pub fn notes_under(
        &self,
        project: &ProjectName,
        identifier: &str,
    ) -> Result<Option<BTreeMap<String, LocatedNote>>> {
        let parsed = self.parse_identifier(identifier)?;
        // Lenient parsing would otherwise turn stray text into the whole project
        if parsed.is_empty() && !identifier.trim().is_empty() {
            return Err(ScribeError::InvalidRequest(format!(
                "identifier {:?} addresses no node",
                identifier
            )));
        }
        let identifier = parsed;
        Ok(self
            .open_existing(project)?
            .and_then(|store| store.get_notes_by_type(&identifier)))
    }

    /// The whole note tree of a project
    pub fn document(&self, project: &ProjectName) -> Result<Node> {
        self.open_existing(project)?
            .map(|store| store.root().clone())
            .ok_or_else(|| ScribeError::NotFound(format!("notes for project '{}'", project)))
    }

    fn open_existing(&self, project: &ProjectName) -> Result<Option<NoteStore>> {
        match NoteStore::open(
            self.document_path(project),
            Arc::clone(&self.hierarchy),
            Arc::clone(&self.backup),
        ) {
            Ok(store) => Ok(Some(store)),
            Err(ScribeError::Storage(StorageError::Missing(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for Notebook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notebook")
            .field("notes_dir", &self.notes_dir)
            .field("strict_identifiers", &self.strict_identifiers)
            .finish()
    }
}
