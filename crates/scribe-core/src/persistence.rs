//! Document persistence
//!
//! Documents are rewritten whole: serialized to a uniquely named temporary
//! sibling file and renamed over the original. Before a file is overwritten the configured
//! [`Backup`] gets a chance to copy it away. Backup failures are logged and
//! never block the write.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::StorageError;

/// Result of a backup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Copy written to the given path
    Created(PathBuf),
    /// Nothing to back up (no existing file, or backups disabled)
    Skipped,
    /// Backup attempted and failed
    Failed(String),
}

/// Capability to preserve a file before it is overwritten
pub trait Backup: Send + Sync {
    fn backup(&self, path: &Path) -> BackupOutcome;
}

/// Never backs anything up
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackup;

impl Backup for NoBackup {
    fn backup(&self, _path: &Path) -> BackupOutcome {
        BackupOutcome::Skipped
    }
}

/// Where [`LocalBackup`] puts its copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupLocation {
    /// A fixed directory shared by all backed-up files
    Directory(PathBuf),
    /// A subdirectory next to each backed-up file
    Sibling(String),
}

/// Timestamped copies on the local disk
#[derive(Debug, Clone)]
pub struct LocalBackup {
    location: BackupLocation,
}

impl LocalBackup {
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            location: BackupLocation::Directory(dir.into()),
        }
    }

    pub fn sibling(subdir: impl Into<String>) -> Self {
        Self {
            location: BackupLocation::Sibling(subdir.into()),
        }
    }

    fn target_for(&self, path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");

        let dir = match &self.location {
            BackupLocation::Directory(dir) => dir.clone(),
            BackupLocation::Sibling(subdir) => path.parent()?.join(subdir),
        };
        Some(dir.join(format!("{}-{}", file_name, timestamp)))
    }
}

impl Backup for LocalBackup {
    fn backup(&self, path: &Path) -> BackupOutcome {
        if !path.is_file() {
            return BackupOutcome::Skipped;
        }
        let Some(target) = self.target_for(path) else {
            return BackupOutcome::Failed(format!("cannot derive backup path for {:?}", path));
        };

        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| copy_to_fresh(path, &target));

        match result {
            Ok(target) => {
                tracing::debug!("Backup created for {:?} at {:?}", path, target);
                BackupOutcome::Created(target)
            }
            Err(e) => BackupOutcome::Failed(e.to_string()),
        }
    }
}

/// Copy `path` to `target`, or to `target-N` for the first free N, never
/// replacing an existing backup
fn copy_to_fresh(path: &Path, target: &Path) -> io::Result<PathBuf> {
    let mut source = fs::File::open(path)?;
    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            target.to_path_buf()
        } else {
            let mut name = target.as_os_str().to_os_string();
            name.push(format!("-{}", attempt));
            PathBuf::from(name)
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                io::copy(&mut source, &mut file)?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Read and deserialize a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let raw = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize a document as pretty JSON and replace the file with it
pub fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    document: &T,
    backup: &dyn Backup,
) -> Result<(), StorageError> {
    let mut raw = serde_json::to_string_pretty(document)?;
    raw.push('\n');
    write_text(path, &raw, backup)
}

/// Replace a file's contents, backing up the previous version first
pub fn write_text(path: &Path, contents: &str, backup: &dyn Backup) -> Result<(), StorageError> {
    if let BackupOutcome::Failed(reason) = backup.backup(path) {
        tracing::warn!("Backup of {:?} failed, writing anyway: {}", path, reason);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    // Each writer gets its own temp file; the dropped handle cleans up on failure.
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    let tmp_path = tmp.path().to_path_buf();
    tmp.write_all(contents.as_bytes())
        .map_err(|e| StorageError::io(&tmp_path, e))?;
    tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;

    tracing::debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}
