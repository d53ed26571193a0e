//! Session endpoint

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::AppState;
use crate::auth::{MaybeUser, hydrate_session};
use crate::error::AppError;

pub fn session_router() -> Router<AppState> {
    Router::new().route("/api/auth/session", get(get_session))
}

/// GET /api/auth/session
///
/// Signed-in callers get the hydrated session; everyone else gets `{}`,
/// including holders of a valid token whose user no longer exists.
async fn get_session(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
) -> Result<Response, AppError> {
    let Some(session) = session else {
        return Ok(Json(serde_json::json!({})).into_response());
    };

    match hydrate_session(&state.db, state.credits.as_ref(), &session).await {
        Ok(hydrated) => Ok(Json(hydrated).into_response()),
        Err(AppError::Unauthorized) => Ok(Json(serde_json::json!({})).into_response()),
        Err(error) => Err(error),
    }
}
