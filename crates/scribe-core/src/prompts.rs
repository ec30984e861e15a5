//! Markdown prompt documents, one per project

use std::path::PathBuf;

use crate::error::{Result, ScribeError, StorageError};
use crate::project::ProjectName;

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts_dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
        }
    }

    pub fn prompt_path(&self, project: &ProjectName) -> PathBuf {
        self.prompts_dir.join(project.file_name("md"))
    }

    /// Raw Markdown of the project's prompt
    pub fn get(&self, project: &ProjectName) -> Result<String> {
        let path = self.prompt_path(project);
        std::fs::read_to_string(&path).map_err(|e| match StorageError::io(&path, e) {
            StorageError::Missing(_) => {
                tracing::error!("Prompt not found: {:?}", path);
                ScribeError::NotFound(format!("prompt for project '{}'", project))
            }
            other => other.into(),
        })
    }
}
