//! Project names
//!
//! Project names key every per-project file (notes, keys, tasks, prompts,
//! disk folders), so they are restricted to a conservative character set.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ScribeError;

lazy_static! {
    static ref PROJECT_NAME: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").unwrap();
}

/// A validated project name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: &str) -> Result<Self, ScribeError> {
        if raw.len() <= 128 && PROJECT_NAME.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ScribeError::InvalidRequest(format!(
                "invalid project name: {:?}",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<name>.<extension>`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        for name in ["ignite", "my-project", "v1.2", "_scratch"] {
            assert!(ProjectName::parse(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        for name in ["", "..", ".hidden", "a/b", "a\\b", "../etc", "a b"] {
            assert!(ProjectName::parse(name).is_err(), "{}", name);
        }
    }

    #[test]
    fn test_file_name() {
        let name = ProjectName::parse("ignite").unwrap();
        assert_eq!(name.file_name("json"), "ignite.json");
    }
}
