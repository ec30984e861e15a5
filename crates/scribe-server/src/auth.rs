//! API key authentication

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{RawPathParams, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use scribe_core::{ProjectName, ScribeError};

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the caller's key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct Caller {
    pub project: ProjectName,
    pub key: String,
}

/// Reject requests whose `X-API-Key` is not registered for the `{project}` path parameter
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    params: RawPathParams,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let raw_project = params
        .iter()
        .find(|(name, _)| *name == "project")
        .map(|(_, value)| value)
        .ok_or_else(|| ScribeError::InvalidRequest("project name required".to_string()))?;
    let project = ProjectName::parse(raw_project)?;

    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    state.keys.authorize(project.as_str(), key.as_deref())?;

    if let Some(key) = key {
        request.extensions_mut().insert(Caller { project, key });
    }
    Ok(next.run(request).await)
}
