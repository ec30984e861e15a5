//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use scribe_core::markdown;
use scribe_core::{FileContent, FileFormat, ProjectName, ScribeError, TaskUpdate};

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Run synchronous core work off the async executor
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> scribe_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn markdown_response(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        body,
    )
        .into_response()
}

/// `?format=` selector
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

impl FormatQuery {
    fn is_markdown(&self) -> bool {
        self.format.as_deref() == Some("md")
    }
}

/// `?identifier=` note address
#[derive(Debug, Default, Deserialize)]
pub struct IdentifierQuery {
    pub identifier: Option<String>,
}

impl IdentifierQuery {
    fn require(self) -> ApiResult<String> {
        self.identifier.ok_or_else(|| {
            ApiError::BadRequest("missing 'identifier' query parameter".to_string())
        })
    }
}

// ============================================================================
// Note Endpoints
// ============================================================================

/// Request to add a note
#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub content: String,
}

/// Request to update a note
#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub updates: Map<String, Value>,
}

/// Add a note under `?identifier=`
pub async fn add_note(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<IdentifierQuery>,
    payload: Result<Json<AddNoteRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let identifier = query.require()?;
    let Json(request) = payload?;

    let project = caller.project.clone();
    let note_id = blocking(move || {
        state
            .notebook
            .add_note(&caller.project, &identifier, &request.content, &caller.key)
    })
    .await?;

    tracing::info!("Note added to {}: {}", project, note_id);
    Ok(Json(json!({
        "success": true,
        "message": "Note added successfully",
        "note_id": note_id
    })))
}

/// Merge fields into an existing note
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((_, note_id)): Path<(String, String)>,
    Query(query): Query<IdentifierQuery>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let identifier = query.require()?;
    let Json(request) = payload?;

    let id = note_id.clone();
    let updated = blocking(move || {
        state
            .notebook
            .update_note(&caller.project, &id, &identifier, &request.updates)
    })
    .await?;

    if !updated {
        return Err(ScribeError::NotFound(format!("note '{}'", note_id)).into());
    }
    Ok(Json(json!({
        "success": true,
        "message": "Note updated successfully",
        "note_id": note_id
    })))
}

/// Delete a note, pruning empty branches
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((_, note_id)): Path<(String, String)>,
    Query(query): Query<IdentifierQuery>,
) -> ApiResult<Json<Value>> {
    let identifier = query.require()?;

    let id = note_id.clone();
    let deleted = blocking(move || {
        state
            .notebook
            .delete_note(&caller.project, &id, &identifier)
    })
    .await?;

    if !deleted {
        return Err(ScribeError::NotFound(format!("note '{}'", note_id)).into());
    }
    Ok(Json(json!({
        "success": true,
        "message": "Note deleted successfully",
        "note_id": note_id
    })))
}

/// A single note by id
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((_, note_id)): Path<(String, String)>,
    Query(query): Query<IdentifierQuery>,
) -> ApiResult<Json<Value>> {
    let identifier = query.require()?;

    let id = note_id.clone();
    let note = blocking(move || state.notebook.get_note(&caller.project, &id, &identifier))
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("note '{}'", note_id)))?;

    Ok(Json(json!({ "success": true, "note": note })))
}

/// All notes at or below the node addressed by the rest of the path
pub async fn get_notes_under(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((_, identifier)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    notes_under(state, caller, identifier).await
}

/// Same as [`get_notes_under`], addressed by `?identifier=`
pub async fn get_notes_by_query(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<IdentifierQuery>,
) -> ApiResult<Json<Value>> {
    notes_under(state, caller, query.require()?).await
}

async fn notes_under(
    state: Arc<AppState>,
    caller: Caller,
    identifier: String,
) -> ApiResult<Json<Value>> {
    let raw = identifier.clone();
    let notes = blocking(move || state.notebook.notes_under(&caller.project, &raw))
        .await?
        .ok_or_else(|| ScribeError::NotFound(format!("node '{}'", identifier)))?;

    Ok(Json(json!({
        "success": true,
        "identifier": identifier,
        "notes": notes
    })))
}

/// The project's whole note tree, as JSON or `?format=md`
pub async fn get_notes_document(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let project = caller.project.clone();
    let document = blocking(move || state.notebook.document(&caller.project)).await?;

    if query.is_markdown() {
        return Ok(markdown_response(markdown::notes_to_markdown(
            project.as_str(),
            &document,
        )));
    }
    Ok(Json(document).into_response())
}

// ============================================================================
// Task Endpoints
// ============================================================================

/// Whole task document
pub async fn get_tasks(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let project = ProjectName::parse(&project)?;
    tracing::info!("Retrieving tasks for {}", project);
    let tasks = blocking(move || state.tasks.read(&project)).await?;
    Ok(render_tasks(tasks, &query))
}

/// One task or `n.m` subtask
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path((project, task_number)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let project = ProjectName::parse(&project)?;
    let task = blocking(move || state.tasks.get(&project, &task_number)).await?;
    Ok(render_tasks(task, &query))
}

fn render_tasks(tasks: Value, query: &FormatQuery) -> Response {
    if query.is_markdown() {
        markdown_response(markdown::tasks_to_markdown(&tasks))
    } else {
        Json(tasks).into_response()
    }
}

/// Change a task's status and/or description
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path((project, task_number)): Path<(String, String)>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let project = ProjectName::parse(&project)?;
    let Json(update) = payload?;

    blocking(move || state.tasks.update(&project, &task_number, &update)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task updated successfully"
    })))
}

// ============================================================================
// Prompt Endpoints
// ============================================================================

/// Raw Markdown prompt for the project
pub async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Response> {
    let content = blocking(move || state.prompts.get(&caller.project)).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    )
        .into_response())
}

// ============================================================================
// Disk Endpoints
// ============================================================================

/// Read `<path>.<format>` from the project folder (`json` when unspecified)
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path((project, file_path)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<Response> {
    let project = ProjectName::parse(&project)?;
    let format = FileFormat::parse(query.format.as_deref().unwrap_or("json"))?;

    let content = blocking(move || state.disk.read(&project, &file_path, &format)).await?;
    Ok(match content {
        FileContent::Json(value) => Json(value).into_response(),
        FileContent::Text { body, content_type } => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
    })
}

/// Replace `<path>.<format>` with the request body
pub async fn put_file(
    State(state): State<Arc<AppState>>,
    Path((project, file_path)): Path<(String, String)>,
    Query(query): Query<FormatQuery>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let project = ProjectName::parse(&project)?;
    let format = FileFormat::parse(query.format.as_deref().unwrap_or("json"))?;

    blocking(move || state.disk.write(&project, &file_path, &format, &body)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "File successfully written"
    })))
}

// ============================================================================
// System Endpoints
// ============================================================================

/// Get server status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "types": state.hierarchy.type_count(),
        "projects": state.keys.project_count()
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Resource not found" })),
    )
}
