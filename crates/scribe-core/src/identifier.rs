//! Hierarchical note identifiers
//!
//! An identifier addresses a node in a project's note tree as a path of
//! `<type:name>` segments joined by `/`:
//!
//! ```text
//! <project:ignite>/<file:src/main.py>/<class:MyClass>/<method:run>
//! ```
//!
//! The default parser is tolerant: any text that is not a well-formed segment
//! is skipped. [`Identifier::parse_strict`] rejects such text instead.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

lazy_static! {
    static ref SEGMENT: Regex = Regex::new(r"<(\w+):([^>]+)>").unwrap();
}

/// One `<type:name>` step of an identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Type as written in the identifier
    pub kind: String,
    /// Node name, case-sensitive
    pub name: String,
}

impl Segment {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Lowercased type, used as the tree key and for hierarchy checks
    pub fn kind_key(&self) -> String {
        self.kind.to_lowercase()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", self.kind, self.name)
    }
}

/// Parsed identifier; zero segments addresses the document root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identifier {
    segments: Vec<Segment>,
}

impl Identifier {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse leniently, dropping anything that is not a `<type:name>` segment
    pub fn parse(input: &str) -> Self {
        let segments = SEGMENT
            .captures_iter(input)
            .map(|caps| Segment::new(&caps[1], &caps[2]))
            .collect();
        Self { segments }
    }

    /// Parse, rejecting any text other than segments and single `/` separators
    pub fn parse_strict(input: &str) -> Result<Self, IdentifierError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in SEGMENT.captures_iter(input) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let gap = &input[cursor..whole.start()];
            let expected_gap = if segments.is_empty() { "" } else { "/" };
            if gap != expected_gap {
                return Err(IdentifierError::Unconsumed {
                    offset: cursor,
                    text: gap.to_string(),
                });
            }
            segments.push(Segment::new(&caps[1], &caps[2]));
            cursor = whole.end();
        }

        if cursor < input.len() {
            return Err(IdentifierError::Unconsumed {
                offset: cursor,
                text: input[cursor..].to_string(),
            });
        }

        Ok(Self { segments })
    }

    /// Parse with the configured strictness
    pub fn parse_with(input: &str, strict: bool) -> Result<Self, IdentifierError> {
        if strict {
            Self::parse_strict(input)
        } else {
            Ok(Self::parse(input))
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Lowercased type sequence, as checked by the hierarchy validator
    pub fn types(&self) -> Vec<String> {
        self.segments.iter().map(Segment::kind_key).collect()
    }

    /// Identifier extended by one more segment
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// (type, name) pairs in order
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.segments
            .iter()
            .map(|s| (s.kind.clone(), s.name.clone()))
            .collect()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
