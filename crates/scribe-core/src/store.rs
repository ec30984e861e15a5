//! Note store
//!
//! A [`NoteStore`] owns the in-memory note tree of one project document. Every
//! mutation is validated first, applied in memory, then flushed to disk before
//! the call returns. A failed flush leaves the store `Dirty`; it then refuses
//! further mutations until [`NoteStore::reload`] or a successful
//! [`NoteStore::save`].
//!
//! Only `add_note` consults the type hierarchy. Update, delete and reads trust
//! the existing path, so a hierarchy change never invalidates stored notes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, ScribeError, StorageError};
use crate::hierarchy::TypeHierarchy;
use crate::identifier::Identifier;
use crate::note::{Node, Note, IDENTIFIER_KEY, NOTES_KEY};
use crate::persistence::{self, Backup};

/// Whether memory and disk agree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// In-memory tree matches the backing file
    Persisted,
    /// A save failed; the in-memory tree is ahead of disk
    Dirty,
}

/// A note together with the node it lives at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedNote {
    pub identifier: String,
    #[serde(flatten)]
    pub note: Note,
}

impl LocatedNote {
    /// The node location always wins over a stray `identifier` attribute
    /// left in older documents.
    pub fn new(identifier: String, mut note: Note) -> Self {
        note.extra.remove(IDENTIFIER_KEY);
        Self { identifier, note }
    }
}

/// CRUD over one project's note document
pub struct NoteStore {
    path: PathBuf,
    root: Node,
    hierarchy: Arc<TypeHierarchy>,
    backup: Arc<dyn Backup>,
    state: DocumentState,
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("notes", &self.root.note_count())
            .finish()
    }
}

impl NoteStore {
    /// Load an existing document; missing or corrupt documents are errors
    pub fn open(
        path: impl Into<PathBuf>,
        hierarchy: Arc<TypeHierarchy>,
        backup: Arc<dyn Backup>,
    ) -> Result<Self> {
        let path = path.into();
        let root = load_tree(&path)?;
        tracing::debug!("Loaded note document {:?}", path);
        Ok(Self {
            path,
            root,
            hierarchy,
            backup,
            state: DocumentState::Persisted,
        })
    }

    /// Load a document, starting from an empty tree if it does not exist yet
    pub fn open_or_create(
        path: impl Into<PathBuf>,
        hierarchy: Arc<TypeHierarchy>,
        backup: Arc<dyn Backup>,
    ) -> Result<Self> {
        let path = path.into();
        let root = match load_tree(&path) {
            Ok(root) => root,
            Err(ScribeError::Storage(StorageError::Missing(_))) => {
                tracing::info!("Starting new note document {:?}", path);
                Node::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            root,
            hierarchy,
            backup,
            state: DocumentState::Persisted,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// The whole note tree
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Add a note under `identifier`, creating intermediate nodes
    ///
    /// Returns the new note's id. A hierarchy violation leaves memory and
    /// disk untouched.
    pub fn add_note(
        &mut self,
        identifier: &Identifier,
        content: &str,
        caller_key: &str,
    ) -> Result<String> {
        self.ensure_writable()?;

        if identifier.types().iter().any(|kind| kind == NOTES_KEY) {
            return Err(ScribeError::InvalidRequest(format!(
                "'{}' is reserved and cannot be used as a type",
                NOTES_KEY
            )));
        }

        if let Err(violation) = self.hierarchy.check(&identifier.types()) {
            tracing::warn!("Rejected note at {}: {}", identifier, violation);
            return Err(violation.into());
        }

        let note = Note::new(content, caller_key);
        let id = note.id.clone();
        self.root
            .descend_or_create(identifier)
            .notes
            .insert(id.clone(), note);

        self.save()?;
        tracing::info!("Added note {} at {}", id, display_path(identifier));
        Ok(id)
    }

    /// Merge `updates` into an existing note
    ///
    /// Returns `Ok(false)` if the node or the note does not exist.
    pub fn update_note(
        &mut self,
        note_id: &str,
        identifier: &Identifier,
        updates: &Map<String, Value>,
    ) -> Result<bool> {
        self.ensure_writable()?;

        let Some(note) = self
            .root
            .resolve_mut(identifier)
            .and_then(|node| node.notes.get_mut(note_id))
        else {
            tracing::debug!(
                "Note {} not found at {} for update",
                note_id,
                display_path(identifier)
            );
            return Ok(false);
        };

        note.apply_update(updates)?;
        self.save()?;
        tracing::info!("Updated note {} at {}", note_id, display_path(identifier));
        Ok(true)
    }

    /// Remove a note and prune any branches left empty
    ///
    /// Returns `Ok(false)` if the node or the note does not exist.
    pub fn delete_note(&mut self, note_id: &str, identifier: &Identifier) -> Result<bool> {
        self.ensure_writable()?;

        let removed = self
            .root
            .resolve_mut(identifier)
            .and_then(|node| node.notes.remove(note_id));
        if removed.is_none() {
            tracing::debug!(
                "Note {} not found at {} for delete",
                note_id,
                display_path(identifier)
            );
            return Ok(false);
        }

        self.root.prune(identifier.segments());
        self.save()?;
        tracing::info!("Deleted note {} at {}", note_id, display_path(identifier));
        Ok(true)
    }

    /// Look up a single note at a node
    pub fn get_note_by_id(&self, note_id: &str, identifier: &Identifier) -> Option<&Note> {
        self.root.resolve(identifier)?.notes.get(note_id)
    }

    /// All notes at or under a node, keyed by note id
    ///
    /// `None` if the node does not exist.
    pub fn get_notes_by_type(
        &self,
        identifier: &Identifier,
    ) -> Option<BTreeMap<String, LocatedNote>> {
        let node = self.root.resolve(identifier)?;
        let mut found = BTreeMap::new();
        node.walk(identifier, &mut |at, note| {
            found.insert(
                note.id.clone(),
                LocatedNote::new(at.to_string(), note.clone()),
            );
        });
        Some(found)
    }

    /// Flush the in-memory tree to disk
    pub fn save(&mut self) -> Result<()> {
        match persistence::write_json(&self.path, &self.root, self.backup.as_ref()) {
            Ok(()) => {
                self.state = DocumentState::Persisted;
                Ok(())
            }
            Err(e) => {
                self.state = DocumentState::Dirty;
                tracing::error!("Failed to save note document {:?}: {}", self.path, e);
                Err(e.into())
            }
        }
    }

    /// Discard in-memory changes and re-read the document
    pub fn reload(&mut self) -> Result<()> {
        self.root = match load_tree(&self.path) {
            Err(ScribeError::Storage(StorageError::Missing(_))) => Node::default(),
            other => other?,
        };
        self.state = DocumentState::Persisted;
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.state {
            DocumentState::Persisted => Ok(()),
            DocumentState::Dirty => Err(StorageError::OutOfSync(self.path.clone()).into()),
        }
    }
}

fn load_tree(path: &Path) -> Result<Node> {
    persistence::read_json(path).map_err(|e| {
        if !matches!(e, StorageError::Missing(_)) {
            tracing::error!("Error loading note document {:?}: {}", path, e);
        }
        e.into()
    })
}

fn display_path(identifier: &Identifier) -> String {
    if identifier.is_root() {
        "<root>".to_string()
    } else {
        identifier.to_string()
    }
}
