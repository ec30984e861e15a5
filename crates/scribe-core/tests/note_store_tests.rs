//! Note store and notebook integration tests

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::fixtures::{ignite, notebook_in, sample_hierarchy};
use rstest::rstest;
use scribe_core::{
    DocumentState, Identifier, LocalBackup, NoBackup, NoteStore, ScribeError, StorageError,
    TypeHierarchy,
};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn updates(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn fresh_store(dir: &TempDir) -> NoteStore {
    NoteStore::open_or_create(
        dir.path().join("ignite.json"),
        sample_hierarchy(),
        Arc::new(NoBackup),
    )
    .unwrap()
}

// === Round trips ===

#[rstest]
#[case("<project:ignite>")]
#[case("<project:ignite>/<file:app.py>")]
#[case("<project:ignite>/<file:app.py>/<class:Server>/<method:run>")]
#[case("<file:src/lib.rs>/<function:main>")]
fn test_add_then_get_round_trip(#[case] raw: &str) {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse(raw);

    let note_id = store.add_note(&id, "remember the cache", "key-1").unwrap();
    let note = store.get_note_by_id(&note_id, &id).unwrap();
    assert_eq!(note.content, "remember the cache");
    assert_eq!(note.created_by, "key-1");
    assert!(note.updated_at.is_none());

    // Survives a reload from disk
    let reopened = NoteStore::open(store.path(), sample_hierarchy(), Arc::new(NoBackup)).unwrap();
    assert_eq!(reopened.get_note_by_id(&note_id, &id), Some(note));
}

#[test]
fn test_document_layout_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>/<File:app.py>");
    let note_id = store.add_note(&id, "hello", "k").unwrap();

    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(
        raw["project"]["ignite"]["file"]["app.py"]["notes"][&note_id]["content"],
        "hello"
    );
}

#[test]
fn test_hierarchy_violation_leaves_document_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    store
        .add_note(
            &Identifier::parse("<project:ignite>/<file:app.py>"),
            "first",
            "k",
        )
        .unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let err = store
        .add_note(
            &Identifier::parse("<project:ignite>/<class:Server>"),
            "bad",
            "k",
        )
        .unwrap_err();
    assert!(matches!(err, ScribeError::Hierarchy(_)));

    assert_eq!(std::fs::read(store.path()).unwrap(), before);
    assert!(store
        .root()
        .resolve(&Identifier::parse("<project:ignite>/<class:Server>"))
        .is_none());
}

#[test]
fn test_reserved_notes_segment_rejected() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let err = store
        .add_note(&Identifier::parse("<notes:x>"), "bad", "k")
        .unwrap_err();
    assert!(matches!(err, ScribeError::InvalidRequest(_)));
    assert!(!store.path().exists());
}

// === Update and delete ===

#[test]
fn test_update_sets_content_and_timestamp() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>/<file:app.py>");
    let note_id = store.add_note(&id, "v1", "k").unwrap();

    thread::sleep(Duration::from_millis(5));
    let changed = store
        .update_note(
            &note_id,
            &id,
            &updates(json!({"content": "v2", "tag": "perf"})),
        )
        .unwrap();
    assert!(changed);

    let note = store.get_note_by_id(&note_id, &id).unwrap();
    assert_eq!(note.content, "v2");
    assert_eq!(note.extra["tag"], "perf");
    let updated_at = note.updated_at.unwrap();
    assert_ne!(updated_at, note.created_at);
    assert!(updated_at > note.created_at);
}

#[rstest]
#[case(json!({"id": "other"}))]
#[case(json!({"created_at": "2020-01-01T00:00:00Z"}))]
#[case(json!({"content": 42}))]
#[case(json!({"identifier": "<file:elsewhere>"}))]
fn test_update_rejects_invalid_fields(#[case] bad: Value) {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>");
    let note_id = store.add_note(&id, "v1", "k").unwrap();

    let err = store.update_note(&note_id, &id, &updates(bad)).unwrap_err();
    assert!(matches!(err, ScribeError::InvalidRequest(_)));
    assert_eq!(store.get_note_by_id(&note_id, &id).unwrap().content, "v1");
}

#[test]
fn test_delete_twice() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>/<file:app.py>");
    let note_id = store.add_note(&id, "gone soon", "k").unwrap();

    assert!(store.delete_note(&note_id, &id).unwrap());
    assert!(!store.delete_note(&note_id, &id).unwrap());
}

#[test]
fn test_delete_prunes_empty_branches() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let keep = Identifier::parse("<project:ignite>");
    let deep = Identifier::parse("<project:ignite>/<file:app.py>/<class:Server>");
    store.add_note(&keep, "top", "k").unwrap();
    let note_id = store.add_note(&deep, "deep", "k").unwrap();

    store.delete_note(&note_id, &deep).unwrap();

    let node = store.root().resolve(&keep).unwrap();
    assert!(node.children.is_empty());
    assert_eq!(node.notes.len(), 1);
}

#[test]
fn test_missing_nodes_are_not_found() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let never = Identifier::parse("<project:ignite>/<file:never.py>");

    assert!(!store.update_note("nope", &never, &updates(json!({"content": "x"}))).unwrap());
    assert!(!store.delete_note("nope", &never).unwrap());
    assert!(store.get_note_by_id("nope", &never).is_none());
    assert!(store.get_notes_by_type(&never).is_none());
}

#[test]
fn test_notes_by_type_includes_descendants() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let file = Identifier::parse("<project:ignite>/<file:app.py>");
    let method = Identifier::parse("<project:ignite>/<file:app.py>/<class:Server>/<method:run>");
    let a = store.add_note(&file, "a", "k").unwrap();
    let b = store.add_note(&method, "b", "k").unwrap();

    let found = store.get_notes_by_type(&file).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[&a].identifier, file.to_string());
    assert_eq!(found[&b].identifier, method.to_string());
}

#[test]
fn test_located_identifier_ignores_stored_attribute() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let file = Identifier::parse("<project:ignite>/<file:app.py>");
    let note_id = store.add_note(&file, "a", "k").unwrap();

    // A document written before `identifier` was reserved
    let mut raw: Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    raw["project"]["ignite"]["file"]["app.py"]["notes"][&note_id]["identifier"] =
        json!("<file:elsewhere>");
    std::fs::write(store.path(), raw.to_string()).unwrap();

    let reopened = NoteStore::open(store.path(), sample_hierarchy(), Arc::new(NoBackup)).unwrap();
    let found = reopened.get_notes_by_type(&file).unwrap();
    assert_eq!(found[&note_id].identifier, file.to_string());

    let rendered = serde_json::to_value(&found).unwrap();
    assert_eq!(rendered[&note_id]["identifier"], json!(file.to_string()));
}

// === Hierarchy changes ===

#[test]
fn test_existing_notes_survive_a_stricter_hierarchy() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>/<file:app.py>");
    let kept = store.add_note(&id, "kept", "k").unwrap();
    let dropped = store.add_note(&id, "dropped", "k").unwrap();

    // project may no longer hold files
    let stricter = Arc::new(
        TypeHierarchy::from_json(r#"{"types": {"project": {"children": ["function"]}}}"#)
            .unwrap(),
    );
    let mut store = NoteStore::open(store.path(), stricter, Arc::new(NoBackup)).unwrap();

    assert_eq!(store.get_note_by_id(&kept, &id).unwrap().content, "kept");
    assert!(store
        .update_note(&kept, &id, &updates(json!({"content": "still here"})))
        .unwrap());
    assert_eq!(
        store.get_note_by_id(&kept, &id).unwrap().content,
        "still here"
    );
    assert!(store.delete_note(&dropped, &id).unwrap());
    assert_eq!(store.get_notes_by_type(&id).unwrap().len(), 1);

    let err = store.add_note(&id, "new", "k").unwrap_err();
    assert!(matches!(err, ScribeError::Hierarchy(_)));
}

// === Persistence failures ===

#[test]
fn test_failed_save_marks_store_dirty() {
    let dir = TempDir::new().unwrap();
    let mut store = fresh_store(&dir);
    let id = Identifier::parse("<project:ignite>");

    // A directory where the document should be makes the rename fail
    std::fs::create_dir(store.path()).unwrap();
    let err = store.add_note(&id, "lost", "k").unwrap_err();
    assert!(matches!(err, ScribeError::Storage(_)));
    assert_eq!(store.state(), DocumentState::Dirty);

    let err = store.add_note(&id, "refused", "k").unwrap_err();
    assert!(matches!(err, ScribeError::Storage(StorageError::OutOfSync(_))));

    std::fs::remove_dir(store.path()).unwrap();
    store.reload().unwrap();
    assert_eq!(store.state(), DocumentState::Persisted);
    assert_eq!(store.root().note_count(), 0);
    store.add_note(&id, "kept", "k").unwrap();
    assert_eq!(store.root().note_count(), 1);
}

#[test]
fn test_corrupt_document_is_storage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ignite.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = NoteStore::open_or_create(&path, sample_hierarchy(), Arc::new(NoBackup)).unwrap_err();
    assert!(matches!(err, ScribeError::Storage(StorageError::Corrupt { .. })));
}

#[test]
fn test_every_save_after_the_first_is_backed_up() {
    let dir = TempDir::new().unwrap();
    let backups = dir.path().join("backups");
    let mut store = NoteStore::open_or_create(
        dir.path().join("ignite.json"),
        sample_hierarchy(),
        Arc::new(LocalBackup::in_directory(&backups)),
    )
    .unwrap();
    let id = Identifier::parse("<project:ignite>");

    store.add_note(&id, "one", "k").unwrap();
    assert!(!backups.exists());
    thread::sleep(Duration::from_millis(2));
    store.add_note(&id, "two", "k").unwrap();
    assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 1);
}

// === Notebook ===

#[test]
fn test_notebook_missing_project() {
    let dir = TempDir::new().unwrap();
    let notebook = notebook_in(dir.path());
    let project = ignite();

    assert!(!notebook.delete_note(&project, "x", "<project:ignite>").unwrap());
    assert!(!notebook
        .update_note(&project, "x", "<project:ignite>", &Map::new())
        .unwrap());
    assert!(notebook.get_note(&project, "x", "<project:ignite>").unwrap().is_none());
    assert!(matches!(notebook.document(&project), Err(ScribeError::NotFound(_))));
}

#[test]
fn test_notebook_notes_under_rejects_unaddressable_text() {
    let dir = TempDir::new().unwrap();
    let notebook = notebook_in(dir.path());
    let project = ignite();
    notebook
        .add_note(&project, "<project:ignite>/<file:app.py>", "a", "k")
        .unwrap();

    for raw in ["get/", "app.py", "<file app.py>"] {
        assert!(
            matches!(
                notebook.notes_under(&project, raw),
                Err(ScribeError::InvalidRequest(_))
            ),
            "{}",
            raw
        );
    }
    let found = notebook
        .notes_under(&project, "<project:ignite>")
        .unwrap()
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_notebook_strict_identifiers() {
    let dir = TempDir::new().unwrap();
    let notebook = notebook_in(dir.path()).with_strict_identifiers(true);
    let err = notebook
        .add_note(&ignite(), "<project:ignite> trailing", "x", "k")
        .unwrap_err();
    assert!(matches!(err, ScribeError::Identifier(_)));
    assert!(!notebook.document_path(&ignite()).exists());
}

#[test]
fn test_concurrent_adds_all_survive() {
    let dir = TempDir::new().unwrap();
    let notebook = Arc::new(notebook_in(dir.path()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let notebook = Arc::clone(&notebook);
            thread::spawn(move || {
                let identifier = format!("<project:ignite>/<file:f{}.py>", i);
                notebook
                    .add_note(&ignite(), &identifier, &format!("note {}", i), "k")
                    .unwrap()
            })
        })
        .collect();
    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let document = notebook.document(&ignite()).unwrap();
    assert_eq!(document.note_count(), 8);
    for (i, id) in ids.iter().enumerate() {
        let identifier = format!("<project:ignite>/<file:f{}.py>", i);
        let note = notebook.get_note(&ignite(), id, &identifier).unwrap().unwrap();
        assert_eq!(note.content, format!("note {}", i));
    }
}
