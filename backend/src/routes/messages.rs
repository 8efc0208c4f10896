//! Message CRUD. Reads are public; every mutation requires a credential,
//! and update/delete additionally require ownership.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{middleware, Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::authorize;
use crate::auth::token::SessionClaims;
use crate::error::ApiError;
use crate::models::message::{Message, NewMessage};
use crate::store::StoreError;
use crate::AppState;

#[derive(Deserialize)]
struct ListParams {
    limit: Option<i64>,
    skip: Option<i64>,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: String,
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.is_empty() {
        return Err(ApiError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn not_found() -> ApiError {
    // Ownership mismatch and a missing row answer identically; a caller
    // probing foreign message ids learns nothing from the difference.
    ApiError::NotFound("message not found".to_string())
}

/// GET /message?limit=&skip=
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.store.list_messages(params.limit, params.skip)?))
}

/// GET /message/:id
async fn get_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let message = state.store.find_message(&id)?.ok_or_else(not_found)?;
    Ok(Json(message))
}

/// POST /message - author is the authenticated caller, never the body
async fn create_message(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Json(body): Json<MessageBody>,
) -> Result<Json<Message>, ApiError> {
    validate_content(&body.content)?;

    let now = Utc::now().timestamp_millis();
    let message = NewMessage {
        id: Uuid::new_v4().to_string(),
        author_id: claims.sub.clone(),
        content: body.content,
        created: now,
        updated: now,
    };

    state.store.insert_message(&message)?;
    let created = state
        .store
        .find_message(&message.id)?
        .ok_or(StoreError::InsertReadback)?;

    Ok(Json(created))
}

/// PATCH /message/:id - owner only
async fn update_message(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Result<Json<Message>, ApiError> {
    validate_content(&body.content)?;

    if !state.store.is_author(&id, &claims.sub)? {
        return Err(not_found());
    }

    // The statement re-checks ownership in its own filter; the row may be
    // gone again by the time it runs.
    let now = Utc::now().timestamp_millis();
    if !state
        .store
        .update_message_content(&id, &claims.sub, &body.content, now)?
    {
        return Err(not_found());
    }

    let updated = state.store.find_message(&id)?.ok_or_else(not_found)?;
    Ok(Json(updated))
}

/// DELETE /message/:id - owner only
async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_message(&id, &claims.sub)? {
        return Err(not_found());
    }

    Ok(Json(serde_json::json!({ "message": "message deleted" })))
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/message", post(create_message))
        .route("/message/:id", patch(update_message).delete(delete_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize(&[])));

    Router::new()
        .route("/message", get(list_messages))
        .route("/message/:id", get(get_message))
        .merge(protected)
        .with_state(state)
}
