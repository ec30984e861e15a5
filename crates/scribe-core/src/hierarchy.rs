//! Type hierarchy validation
//!
//! The hierarchy document declares which note types may nest under which:
//!
//! ```json
//! {
//!   "types": {
//!     "project": { "children": ["file"] },
//!     "file":    { "children": ["class", "function"] },
//!     "class":   { "children": ["method"] }
//!   }
//! }
//! ```
//!
//! Type names are case-insensitive and normalized to lowercase at load time.
//! A type that only ever appears as a child may be left undeclared; any
//! attempt to descend below it fails validation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, HierarchyViolation};
use crate::note::NOTES_KEY;

#[derive(Debug, Deserialize)]
struct HierarchyDocument {
    types: BTreeMap<String, TypeEntry>,
}

#[derive(Debug, Deserialize)]
struct TypeEntry {
    #[serde(default)]
    children: Vec<String>,
}

/// Immutable parent -> allowed children map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeHierarchy {
    types: BTreeMap<String, BTreeSet<String>>,
}

impl TypeHierarchy {
    /// Load the hierarchy from a JSON document on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        let hierarchy = Self::from_json(&raw).map_err(|e| match e {
            ConfigError::Invalid(message) => ConfigError::Malformed {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        tracing::info!(
            "Type hierarchy loaded from {:?} ({} types)",
            path,
            hierarchy.type_count()
        );
        Ok(hierarchy)
    }

    /// Parse the hierarchy from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: HierarchyDocument =
            serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut types: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (parent, entry) in document.types {
            let parent = parent.to_lowercase();
            let children: BTreeSet<String> =
                entry.children.iter().map(|c| c.to_lowercase()).collect();

            if parent == NOTES_KEY || children.contains(NOTES_KEY) {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is reserved and cannot be used as a type name",
                    NOTES_KEY
                )));
            }

            types.entry(parent).or_default().extend(children);
        }

        Ok(Self { types })
    }

    /// Check every consecutive (parent, child) pair; the first violation wins
    pub fn check<S: AsRef<str>>(&self, types: &[S]) -> Result<(), HierarchyViolation> {
        for pair in types.windows(2) {
            let parent = pair[0].as_ref().to_lowercase();
            let child = pair[1].as_ref().to_lowercase();

            match self.types.get(&parent) {
                None => return Err(HierarchyViolation::UnknownParent { parent, child }),
                Some(children) if !children.contains(&child) => {
                    return Err(HierarchyViolation::IllegalChild { parent, child })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// True if the type sequence is a legal descent path
    pub fn validate<S: AsRef<str>>(&self, types: &[S]) -> bool {
        match self.check(types) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!("Invalid hierarchy: {}", violation);
                false
            }
        }
    }

    /// Number of declared parent types
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
