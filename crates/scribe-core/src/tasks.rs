//! Project task lists
//!
//! Task documents are keyed by task number; subtasks live inside their main
//! task under a dotted number:
//!
//! ```json
//! {
//!   "overview": "...",
//!   "tasks": {
//!     "1": {
//!       "description": "Set up the project",
//!       "status": false,
//!       "1.1": { "task": "Create repository", "status": true }
//!     }
//!   }
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, ScribeError, StorageError};
use crate::locks::ProjectLocks;
use crate::persistence::{self, Backup};
use crate::project::ProjectName;

/// Fields a task update may change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub status: Option<bool>,
    /// Only applied to main tasks
    pub description: Option<String>,
}

/// Task documents for every project under one directory
pub struct TaskBook {
    tasks_dir: PathBuf,
    backup: Arc<dyn Backup>,
    locks: ProjectLocks,
}

impl TaskBook {
    pub fn new(tasks_dir: impl Into<PathBuf>, backup: Arc<dyn Backup>) -> Self {
        Self {
            tasks_dir: tasks_dir.into(),
            backup,
            locks: ProjectLocks::new(),
        }
    }

    pub fn document_path(&self, project: &ProjectName) -> PathBuf {
        self.tasks_dir.join(project.file_name("json"))
    }

    /// The whole task document
    pub fn read(&self, project: &ProjectName) -> Result<Value> {
        let path = self.document_path(project);
        persistence::read_json(&path).map_err(|e| match e {
            StorageError::Missing(_) => {
                tracing::error!("Task file not found: {:?}", path);
                ScribeError::NotFound(format!("tasks for project '{}'", project))
            }
            other => other.into(),
        })
    }

    /// `{"tasks": {number: task}}` for one task or subtask
    pub fn get(&self, project: &ProjectName, task_number: &str) -> Result<Value> {
        let document = self.read(project)?;
        let task = lookup(&document, task_number)
            .cloned()
            .ok_or_else(|| task_not_found(task_number))?;
        let mut tasks = Map::new();
        tasks.insert(task_number.to_string(), task);
        Ok(json!({ "tasks": tasks }))
    }

    /// Change a task's status and/or description
    pub fn update(
        &self,
        project: &ProjectName,
        task_number: &str,
        update: &TaskUpdate,
    ) -> Result<()> {
        self.locks.with_lock(project.as_str(), || {
            let mut document = self.read(project)?;
            let is_subtask = task_number.contains('.');

            let task = lookup_mut(&mut document, task_number)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| task_not_found(task_number))?;

            if let Some(status) = update.status {
                task.insert("status".to_string(), Value::Bool(status));
            }
            if let Some(description) = &update.description {
                if !is_subtask {
                    task.insert(
                        "description".to_string(),
                        Value::String(description.clone()),
                    );
                }
            }

            persistence::write_json(
                &self.document_path(project),
                &document,
                self.backup.as_ref(),
            )?;
            tracing::info!("Updated task {} in project {}", task_number, project);
            Ok(())
        })
    }
}

fn main_task_of(task_number: &str) -> &str {
    task_number
        .split_once('.')
        .map_or(task_number, |(main, _)| main)
}

fn lookup<'a>(document: &'a Value, task_number: &str) -> Option<&'a Value> {
    let tasks = document.get("tasks")?;
    if task_number.contains('.') {
        tasks.get(main_task_of(task_number))?.get(task_number)
    } else {
        tasks.get(task_number)
    }
}

fn lookup_mut<'a>(document: &'a mut Value, task_number: &str) -> Option<&'a mut Value> {
    let tasks = document.get_mut("tasks")?;
    if task_number.contains('.') {
        tasks.get_mut(main_task_of(task_number))?.get_mut(task_number)
    } else {
        tasks.get_mut(task_number)
    }
}

fn task_not_found(task_number: &str) -> ScribeError {
    tracing::error!("Task or subtask not found: {}", task_number);
    ScribeError::NotFound(format!("task or subtask '{}'", task_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{LocalBackup, NoBackup};
    use tempfile::TempDir;

    fn book_with_sample(dir: &TempDir) -> (TaskBook, ProjectName) {
        let project = ProjectName::parse("ignite").unwrap();
        let book = TaskBook::new(dir.path(), Arc::new(NoBackup));
        std::fs::write(
            book.document_path(&project),
            json!({
                "overview": "Plan",
                "tasks": {
                    "1": {"description": "Build", "status": false,
                          "1.1": {"task": "Compile", "status": false}},
                    "2": {"description": "Test", "status": false}
                }
            })
            .to_string(),
        )
        .unwrap();
        (book, project)
    }

    #[test]
    fn test_get_main_task_and_subtask() {
        let dir = TempDir::new().unwrap();
        let (book, project) = book_with_sample(&dir);

        let task = book.get(&project, "2").unwrap();
        assert_eq!(task["tasks"]["2"]["description"], "Test");

        let sub = book.get(&project, "1.1").unwrap();
        assert_eq!(
            sub,
            json!({"tasks": {"1.1": {"task": "Compile", "status": false}}})
        );
    }

    #[test]
    fn test_missing_task_and_project() {
        let dir = TempDir::new().unwrap();
        let (book, project) = book_with_sample(&dir);

        assert!(matches!(book.get(&project, "9"), Err(ScribeError::NotFound(_))));
        assert!(matches!(book.get(&project, "2.1"), Err(ScribeError::NotFound(_))));

        let other = ProjectName::parse("nope").unwrap();
        assert!(matches!(book.read(&other), Err(ScribeError::NotFound(_))));
    }

    #[test]
    fn test_update_status_and_description() {
        let dir = TempDir::new().unwrap();
        let (book, project) = book_with_sample(&dir);

        let update = TaskUpdate {
            status: Some(true),
            description: Some("Build it all".to_string()),
        };
        book.update(&project, "1", &update).unwrap();
        book.update(&project, "1.1", &update).unwrap();

        let doc = book.read(&project).unwrap();
        assert_eq!(doc["tasks"]["1"]["status"], true);
        assert_eq!(doc["tasks"]["1"]["description"], "Build it all");
        assert_eq!(doc["tasks"]["1"]["1.1"]["status"], true);
        assert!(doc["tasks"]["1"]["1.1"].get("description").is_none());
    }

    #[test]
    fn test_update_backs_up_previous_document() {
        let dir = TempDir::new().unwrap();
        let project = ProjectName::parse("ignite").unwrap();
        let backups = dir.path().join("backups");
        let book = TaskBook::new(dir.path(), Arc::new(LocalBackup::in_directory(&backups)));
        std::fs::write(
            book.document_path(&project),
            r#"{"tasks": {"1": {"description": "x", "status": false}}}"#,
        )
        .unwrap();

        book.update(
            &project,
            "1",
            &TaskUpdate {
                status: Some(true),
                description: None,
            },
        )
            .unwrap();
        assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 1);
    }
}
