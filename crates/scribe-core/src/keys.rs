//! Per-project API keys
//!
//! Each project has a `<project>.json` file in the users directory holding
//! either a list of keys or an object whose keys are the API keys:
//!
//! ```json
//! ["_mu0WygMRETwooV39aj0PQ"]
//! {"_mu0WygMRETwooV39aj0PQ": {"name": "ci"}}
//! ```
//!
//! The directory is read once; the registry is immutable afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result, ScribeError};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeyFile {
    List(Vec<String>),
    Map(BTreeMap<String, serde_json::Value>),
}

impl KeyFile {
    fn into_keys(self) -> BTreeSet<String> {
        match self {
            KeyFile::List(keys) => keys.into_iter().collect(),
            KeyFile::Map(map) => map.into_keys().collect(),
        }
    }
}

/// Accepted keys per project
#[derive(Debug, Clone, Default)]
pub struct ApiKeyRegistry {
    projects: BTreeMap<String, BTreeSet<String>>,
}

impl ApiKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<project>.json` key file in a directory
    ///
    /// A missing directory yields an empty registry (every request is then
    /// unauthorized). Unreadable or malformed key files are skipped with a
    /// warning.
    pub fn load_dir(dir: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        if !dir.is_dir() {
            tracing::warn!(
                "API key directory {:?} not found; all keyed routes will reject",
                dir
            );
            return Ok(registry);
        }

        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Io {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(project) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<KeyFile>(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(file) => registry.insert(project, file.into_keys()),
                Err(e) => tracing::warn!("Skipping API key file {:?}: {}", path, e),
            }
        }

        tracing::info!("Loaded API keys for {} projects", registry.project_count());
        Ok(registry)
    }

    /// Register keys for a project, replacing any previous set
    pub fn insert<I, S>(&mut self, project: &str, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projects
            .insert(
                project.to_string(),
                keys.into_iter().map(Into::into).collect(),
            );
    }

    pub fn is_authorized(&self, project: &str, key: &str) -> bool {
        self.projects
            .get(project)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Check a caller's key, failing with `Unauthorized`
    pub fn authorize(&self, project: &str, key: Option<&str>) -> Result<()> {
        match key {
            Some(key) if self.is_authorized(project, key) => Ok(()),
            Some(_) => {
                tracing::warn!("Unauthorized access attempt for project '{}'", project);
                Err(ScribeError::Unauthorized("invalid API key".to_string()))
            }
            None => {
                tracing::warn!("Missing API key for project '{}'", project);
                Err(ScribeError::Unauthorized("missing API key".to_string()))
            }
        }
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_authorize() {
        let mut registry = ApiKeyRegistry::new();
        registry.insert("ignite", ["k1", "k2"]);

        assert!(registry.authorize("ignite", Some("k1")).is_ok());
        assert!(matches!(
            registry.authorize("ignite", Some("nope")),
            Err(ScribeError::Unauthorized(_))
        ));
        assert!(registry.authorize("ignite", None).is_err());
        assert!(registry.authorize("other", Some("k1")).is_err());
    }

    #[test]
    fn test_load_dir_list_and_map_formats() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ignite.json"), r#"["abc"]"#).unwrap();
        std::fs::write(dir.path().join("spark.json"), r#"{"xyz": {"name": "ci"}}"#).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{{").unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let registry = ApiKeyRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.project_count(), 2);
        assert!(registry.is_authorized("ignite", "abc"));
        assert!(registry.is_authorized("spark", "xyz"));
        assert!(!registry.is_authorized("broken", "abc"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let registry = ApiKeyRegistry::load_dir("/no/such/users/dir").unwrap();
        assert_eq!(registry.project_count(), 0);
    }
}
