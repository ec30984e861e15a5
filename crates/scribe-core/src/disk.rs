//! Free-form project files
//!
//! Files live at `<disk_dir>/<project>/<path>.<format>`. The format doubles
//! as the file extension and decides how content is parsed and rendered.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, ScribeError, StorageError};
use crate::locks::ProjectLocks;
use crate::markdown;
use crate::persistence::{self, Backup};
use crate::project::ProjectName;

lazy_static! {
    static ref FORMAT: Regex = Regex::new(r"^[A-Za-z0-9]{1,16}$").unwrap();
}

/// How a file's content is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    /// `yml` or `yaml`, kept as written
    Yaml(String),
    Markdown,
    /// Any other extension, served as plain text
    Text(String),
}

impl FileFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        if !FORMAT.is_match(raw) {
            return Err(ScribeError::InvalidRequest(format!(
                "invalid format: {:?}",
                raw
            )));
        }
        Ok(match raw.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "yml" | "yaml" => FileFormat::Yaml(raw.to_lowercase()),
            "md" => FileFormat::Markdown,
            other => FileFormat::Text(other.to_string()),
        })
    }

    pub fn extension(&self) -> &str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Yaml(ext) | FileFormat::Text(ext) => ext,
            FileFormat::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Json => "application/json",
            FileFormat::Markdown => "text/markdown; charset=utf-8",
            FileFormat::Yaml(_) | FileFormat::Text(_) => "text/plain; charset=utf-8",
        }
    }
}

/// Content read from disk
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    Json(Value),
    Text {
        body: String,
        content_type: &'static str,
    },
}

/// Project folders under one base directory
pub struct DiskStore {
    base_dir: PathBuf,
    backup: Arc<dyn Backup>,
    // Keyed by resolved file path
    locks: ProjectLocks,
}

impl DiskStore {
    pub fn new(base_dir: impl Into<PathBuf>, backup: Arc<dyn Backup>) -> Self {
        Self {
            base_dir: base_dir.into(),
            backup,
            locks: ProjectLocks::new(),
        }
    }

    /// Full path of a project file, rejecting anything that escapes the project folder
    pub fn resolve(
        &self,
        project: &ProjectName,
        file_path: &str,
        format: &FileFormat,
    ) -> Result<PathBuf> {
        let relative = Path::new(file_path);
        let clean = !file_path.is_empty()
            && !file_path
                .split('/')
                .any(|s| s.is_empty() || s == "." || s == "..")
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(ScribeError::InvalidRequest(format!(
                "invalid file path: {:?}",
                file_path
            )));
        }

        let mut full = self
            .base_dir
            .join(project.as_str())
            .join(relative)
            .into_os_string();
        full.push(".");
        full.push(format.extension());
        Ok(PathBuf::from(full))
    }

    /// Read a file in the requested format
    ///
    /// Markdown requests fall back to rendering the `.json` file of the same
    /// name when no `.md` file exists.
    pub fn read(
        &self,
        project: &ProjectName,
        file_path: &str,
        format: &FileFormat,
    ) -> Result<FileContent> {
        let path = self.resolve(project, file_path, format)?;

        if *format == FileFormat::Markdown && !path.is_file() {
            let json_path = self.resolve(project, file_path, &FileFormat::Json)?;
            let document: Value =
                persistence::read_json(&json_path).map_err(not_found(&json_path))?;
            tracing::info!("Rendering {:?} as Markdown", json_path);
            return Ok(FileContent::Text {
                body: markdown::json_to_markdown(&document),
                content_type: format.content_type(),
            });
        }

        tracing::info!("Reading file: {:?}", path);
        match format {
            FileFormat::Json => {
                let document: Value =
                    persistence::read_json(&path).map_err(not_found(&path))?;
                Ok(FileContent::Json(document))
            }
            FileFormat::Yaml(_) => {
                let body = read_text(&path)?;
                serde_yaml::from_str::<serde_yaml::Value>(&body).map_err(|e| {
                    ScribeError::Storage(StorageError::Corrupt {
                        path: path.clone(),
                        message: e.to_string(),
                    })
                })?;
                Ok(FileContent::Text {
                    body,
                    content_type: format.content_type(),
                })
            }
            FileFormat::Markdown | FileFormat::Text(_) => Ok(FileContent::Text {
                body: read_text(&path)?,
                content_type: format.content_type(),
            }),
        }
    }

    /// Replace a file, backing up the previous version
    ///
    /// Writers to the same file are serialized so each backup captures the
    /// version its writer replaced.
    pub fn write(
        &self,
        project: &ProjectName,
        file_path: &str,
        format: &FileFormat,
        body: &[u8],
    ) -> Result<()> {
        let path = self.resolve(project, file_path, format)?;

        let text = std::str::from_utf8(body)
            .map_err(|_| ScribeError::InvalidRequest("file content must be UTF-8".to_string()))?;

        let backup = self.backup.as_ref();
        match format {
            FileFormat::Json => {
                let document: Value = serde_json::from_str(text)
                    .map_err(|e| ScribeError::InvalidRequest(format!("invalid JSON: {}", e)))?;
                self.locks.with_lock(&path.to_string_lossy(), || {
                    persistence::write_json(&path, &document, backup)
                })?;
            }
            FileFormat::Yaml(_) => {
                serde_yaml::from_str::<serde_yaml::Value>(text)
                    .map_err(|e| ScribeError::InvalidRequest(format!("invalid YAML: {}", e)))?;
                self.locks.with_lock(&path.to_string_lossy(), || {
                    persistence::write_text(&path, text, backup)
                })?;
            }
            FileFormat::Markdown | FileFormat::Text(_) => {
                self.locks.with_lock(&path.to_string_lossy(), || {
                    persistence::write_text(&path, text, backup)
                })?;
            }
        }

        tracing::info!("File successfully written to {:?}", path);
        Ok(())
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| not_found(path)(StorageError::io(path, e)))
}

fn not_found(path: &Path) -> impl Fn(StorageError) -> ScribeError + '_ {
    move |e| match e {
        StorageError::Missing(_) => {
            tracing::error!("File not found: {:?}", path);
            ScribeError::NotFound("file".to_string())
        }
        other => other.into(),
    }
}
