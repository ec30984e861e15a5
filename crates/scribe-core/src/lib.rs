//! Scribe Core - Hierarchical project notes backed by JSON documents
//!
//! This crate provides the storage and validation layer behind the scribe
//! server:
//!
//! - **Identifier**: `<type:name>/<type:name>` paths into a project's note tree
//! - **Hierarchy**: Which note types may nest under which, loaded once at startup
//! - **Note**: Notes and the recursive node tree that holds them
//! - **Store**: CRUD over one project's note document with persist-on-mutate
//! - **Notebook**: Project-scoped note access with per-project write locks
//! - **Tasks**: Project task lists with main tasks and dotted subtasks
//! - **Prompts**: One Markdown prompt per project
//! - **Disk**: Free-form project files in JSON, YAML, Markdown or text
//! - **Keys**: Per-project API keys
//! - **Markdown**: Rendering for tasks, note trees and OpenAPI documents
//! - **Config**: Paths, listener address, CORS and backup settings
//!
//! # Document layout
//!
//! ```text
//! Project → <file:app.py> → <class:Server> → notes{id → Note}
//! ```
//!
//! Each level of the tree maps a type name to named child nodes. Notes live
//! under the reserved `notes` key of the node they are attached to.

pub mod config;
pub mod disk;
pub mod error;
pub mod hierarchy;
pub mod identifier;
pub mod keys;
pub mod locks;
pub mod markdown;
pub mod note;
pub mod notebook;
pub mod persistence;
pub mod project;
pub mod prompts;
pub mod store;
pub mod tasks;

pub use config::{
    BackupConfig, CorsConfig, IdentifierConfig, PathsConfig, ScribeConfig, ServerConfig,
};
pub use disk::{DiskStore, FileContent, FileFormat};
pub use error::{
    ConfigError, HierarchyViolation, IdentifierError, Result, ScribeError, StorageError,
};
pub use hierarchy::TypeHierarchy;
pub use identifier::{Identifier, Segment};
pub use keys::ApiKeyRegistry;
pub use locks::ProjectLocks;
pub use note::{Node, Note, IDENTIFIER_KEY, NOTES_KEY};
pub use notebook::Notebook;
pub use persistence::{Backup, BackupOutcome, LocalBackup, NoBackup};
pub use project::ProjectName;
pub use prompts::PromptLibrary;
pub use store::{DocumentState, LocatedNote, NoteStore};
pub use tasks::{TaskBook, TaskUpdate};
