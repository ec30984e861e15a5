//! Shared hierarchy and notebook fixtures

use std::path::Path;
use std::sync::Arc;

use scribe_core::{NoBackup, Notebook, ProjectName, TypeHierarchy};

/// project → file → class → method, file → function
pub const SAMPLE_HIERARCHY: &str = r#"{
    "types": {
        "project": { "children": ["file"] },
        "file": { "children": ["class", "function"] },
        "class": { "children": ["method"] }
    }
}"#;

pub fn sample_hierarchy() -> Arc<TypeHierarchy> {
    Arc::new(TypeHierarchy::from_json(SAMPLE_HIERARCHY).expect("sample hierarchy parses"))
}

/// Notebook over `dir` with backups disabled
#[allow(dead_code)]
pub fn notebook_in(dir: &Path) -> Notebook {
    Notebook::new(dir, sample_hierarchy(), Arc::new(NoBackup))
}

#[allow(dead_code)]
pub fn ignite() -> ProjectName {
    ProjectName::parse("ignite").expect("valid project name")
}
