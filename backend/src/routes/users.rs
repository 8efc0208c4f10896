//! Public user profiles.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiError;
use crate::models::user::PublicProfile;
use crate::AppState;

/// GET /user/:id - public profile; provider identity stays internal
async fn get_user_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    let user = state
        .store
        .find_user(&id)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(PublicProfile::from(&user)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user/:id", get(get_user_info))
        .with_state(state)
}
