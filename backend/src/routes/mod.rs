pub mod auth;
pub mod health;
pub mod messages;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// The full API surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(messages::router(state))
}
