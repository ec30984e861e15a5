//! Scribe Server - Project notes API
//!
//! HTTP server exposing notes, tasks, prompts and disk files per project.

pub mod auth;
pub mod error;
pub mod http;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use scribe_core::{
    ApiKeyRegistry, Backup, ConfigError, CorsConfig, DiskStore, LocalBackup, NoBackup, Notebook,
    PromptLibrary, ScribeConfig, TaskBook, TypeHierarchy,
};

/// Shared application state
pub struct AppState {
    pub config: ScribeConfig,
    pub hierarchy: Arc<TypeHierarchy>,
    pub keys: ApiKeyRegistry,
    pub notebook: Notebook,
    pub tasks: TaskBook,
    pub prompts: PromptLibrary,
    pub disk: DiskStore,
}

impl AppState {
    /// Assemble state from an already-loaded hierarchy and key registry
    pub fn new(config: ScribeConfig, hierarchy: TypeHierarchy, keys: ApiKeyRegistry) -> Self {
        let hierarchy = Arc::new(hierarchy);
        let paths = &config.paths;

        let (task_backup, disk_backup): (Arc<dyn Backup>, Arc<dyn Backup>) =
            if config.backups.enabled {
                (
                    Arc::new(LocalBackup::in_directory(paths.tasks_backups_dir())),
                    Arc::new(LocalBackup::sibling("backups")),
                )
            } else {
                (Arc::new(NoBackup), Arc::new(NoBackup))
            };

        Self {
            notebook: Notebook::from_config(&config, Arc::clone(&hierarchy)),
            tasks: TaskBook::new(paths.tasks_dir(), task_backup),
            prompts: PromptLibrary::new(paths.prompts_dir()),
            disk: DiskStore::new(paths.disk_dir(), disk_backup),
            hierarchy,
            keys,
            config,
        }
    }

    /// Load the type hierarchy and API keys named by the configuration
    ///
    /// A missing or malformed hierarchy document is an error; the server must
    /// not start without one.
    pub fn from_config(config: ScribeConfig) -> Result<Self, ConfigError> {
        let hierarchy = TypeHierarchy::load(config.paths.hierarchy_file())?;
        let keys = ApiKeyRegistry::load_dir(config.paths.users_dir())?;
        Ok(Self::new(config, hierarchy, keys))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let keyed = Router::new()
        // Note endpoints
        .route("/notes/{project}", get(http::get_notes_document))
        .route("/notes/{project}/add", post(http::add_note))
        .route("/notes/{project}/update/{note_id}", put(http::update_note))
        .route(
            "/notes/{project}/delete/{note_id}",
            delete(http::delete_note),
        )
        .route("/notes/{project}/get/", get(http::get_notes_by_query))
        .route("/notes/{project}/get/{note_id}", get(http::get_note))
        .route("/notes/{project}/{*identifier}", get(http::get_notes_under))
        // Prompt endpoints
        .route("/prompts/{project}/get", get(http::get_prompt))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        // Task endpoints
        .route("/tasks/{project}", get(http::get_tasks))
        .route(
            "/tasks/{project}/{task_number}",
            get(http::get_task).put(http::update_task),
        )
        // Disk endpoints
        .route(
            "/disk/{project}/{*path}",
            get(http::get_file).put(http::put_file),
        )
        // System endpoints
        .route("/status", get(http::get_status))
        .merge(keyed)
        .fallback(http::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Scribe server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
