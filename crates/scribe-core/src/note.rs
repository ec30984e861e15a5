//! Notes and the note tree
//!
//! A project's note document is a tree of nodes. Each node may hold a `notes`
//! map (note id -> note) and any number of `type -> name -> node` children:
//!
//! ```json
//! {
//!   "notes": { "<uuid>": { "id": "<uuid>", "content": "root note", ... } },
//!   "file": {
//!     "app.py": {
//!       "notes": { ... },
//!       "class": { "App": { "notes": { ... } } }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Result, ScribeError};
use crate::identifier::{Identifier, Segment};

/// Key under which a node stores its notes
pub const NOTES_KEY: &str = "notes";

/// Key under which a located note reports its node
pub const IDENTIFIER_KEY: &str = "identifier";

/// Fields an update may not touch
const RESERVED_FIELDS: [&str; 5] = [
    "id",
    "created_at",
    "created_by",
    "updated_at",
    IDENTIFIER_KEY,
];

/// A single note record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// API key of the caller that created the note
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Extra attributes merged in by updates
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Note {
    /// Create a note with a fresh unique id
    pub fn new(content: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            created_at: Utc::now(),
            created_by: created_by.into(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Merge update fields and stamp `updated_at`
    ///
    /// Nothing is changed if any field is rejected.
    pub fn apply_update(&mut self, updates: &Map<String, Value>) -> Result<()> {
        if let Some(field) = updates
            .keys()
            .find(|k| RESERVED_FIELDS.contains(&k.as_str()))
        {
            return Err(ScribeError::InvalidRequest(format!(
                "field '{}' cannot be updated",
                field
            )));
        }

        let content = match updates.get("content") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ScribeError::InvalidRequest(
                    "'content' must be a string".to_string(),
                ))
            }
        };

        if let Some(content) = content {
            self.content = content;
        }
        for (key, value) in updates.iter().filter(|(k, _)| k.as_str() != "content") {
            self.extra.insert(key.clone(), value.clone());
        }
        self.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// A point in the note tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, Note>,
    /// type -> name -> child node
    #[serde(flatten)]
    pub children: BTreeMap<String, BTreeMap<String, Node>>,
}

impl Node {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.children.values().all(BTreeMap::is_empty)
    }

    /// Follow segments without creating anything
    pub fn resolve(&self, identifier: &Identifier) -> Option<&Node> {
        identifier
            .segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Mutable variant of [`Node::resolve`]
    pub fn resolve_mut(&mut self, identifier: &Identifier) -> Option<&mut Node> {
        identifier
            .segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Follow segments, creating intermediate nodes as needed
    pub fn descend_or_create(&mut self, identifier: &Identifier) -> &mut Node {
        identifier.segments().iter().fold(self, |node, segment| {
            node.children
                .entry(segment.kind_key())
                .or_default()
                .entry(segment.name.clone())
                .or_default()
        })
    }

    fn child(&self, segment: &Segment) -> Option<&Node> {
        let kind = segment.kind_key();
        if kind == NOTES_KEY {
            return None;
        }
        self.children.get(&kind)?.get(&segment.name)
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Node> {
        let kind = segment.kind_key();
        if kind == NOTES_KEY {
            return None;
        }
        self.children.get_mut(&kind)?.get_mut(&segment.name)
    }

    /// Remove empty nodes along the identifier path, deepest first
    pub fn prune(&mut self, segments: &[Segment]) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let kind = first.kind_key();
        let Some(named) = self.children.get_mut(&kind) else {
            return;
        };
        if let Some(child) = named.get_mut(&first.name) {
            child.prune(rest);
            if child.is_empty() {
                named.remove(&first.name);
            }
        }
        if named.is_empty() {
            self.children.remove(&kind);
        }
    }

    /// Visit every note at or below this node with the identifier of its node
    pub fn walk<'a>(&'a self, at: &Identifier, visit: &mut dyn FnMut(&Identifier, &'a Note)) {
        for note in self.notes.values() {
            visit(at, note);
        }
        for (kind, named) in &self.children {
            for (name, child) in named {
                child.walk(&at.child(Segment::new(kind.clone(), name.clone())), visit);
            }
        }
    }

    /// Total number of notes at or below this node
    pub fn note_count(&self) -> usize {
        let mut count = 0;
        self.walk(&Identifier::root(), &mut |_, _| count += 1);
        count
    }
}
