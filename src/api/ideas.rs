//! Idea endpoints
//!
//! Authoring and saving ideas. These feed the lists attached to the session.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use super::converters::idea_to_dto;
use super::dto::CreateIdeaRequest;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

const MAX_TITLE_CHARS: usize = 200;
const MAX_COMPONENTS: usize = 50;

pub fn ideas_router() -> Router<AppState> {
    Router::new()
        .route("/api/ideas", post(create_idea))
        .route("/api/ideas/:id", get(get_idea))
        .route("/api/ideas/:id/save", post(save_idea).delete(unsave_idea))
}

fn validate_create(request: &CreateIdeaRequest) -> Result<(), AppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    if request.components.len() > MAX_COMPONENTS {
        return Err(AppError::Validation(format!(
            "an idea may have at most {MAX_COMPONENTS} components"
        )));
    }
    if request.components.iter().any(|c| c.name.trim().is_empty()) {
        return Err(AppError::Validation(
            "component name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/ideas
async fn create_idea(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateIdeaRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create(&request)?;

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let idea = state
        .db
        .create_idea(
            &session.user_id,
            request.title.trim(),
            description,
            &request.components,
        )
        .await?;

    tracing::info!(idea_id = %idea.id, author_id = %session.user_id, "Idea created");

    let dto = idea_to_dto(&state.db, idea).await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// GET /api/ideas/:id
async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let idea = state.db.get_idea(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(idea_to_dto(&state.db, idea).await?))
}

/// POST /api/ideas/:id/save
async fn save_idea(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.get_idea(&id).await?.ok_or(AppError::NotFound)?;
    let inserted = state.db.save_idea(&session.user_id, &id).await?;
    tracing::debug!(idea_id = %id, user_id = %session.user_id, inserted, "Idea saved");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/ideas/:id/save
async fn unsave_idea(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.db.unsave_idea(&session.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
