//! Sign-in endpoints: provider redirect, OAuth callback, credential check.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;

use crate::auth::middleware::authorize;
use crate::auth::provider::oauth_state;
use crate::auth::resolver::resolve_sign_in;
use crate::auth::token::SessionClaims;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    // Returned by the provider but not checked here; the round-trip state
    // lives and dies with the provider redirect.
    #[allow(dead_code)]
    state: Option<String>,
}

/// GET /auth/:provider - hand the browser to the identity provider
async fn begin_auth(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let url = state.oauth.authorize_url(&provider, &oauth_state())?;
    Ok(Redirect::to(&url))
}

/// GET /auth/:provider/callback - complete sign-in and hand out a token
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ApiError> {
    let code = params
        .code
        .ok_or_else(|| ApiError::Validation("missing authorization code".to_string()))?;

    let profile = state.oauth.exchange_code(&provider, &code).await?;
    let user = resolve_sign_in(&state.store, &profile)?;

    tracing::info!(user_id = %user.id, provider = %profile.provider, "user signed in");

    let token = state.tokens.issue(&user).map_err(|e| {
        tracing::error!("token issue failed: {e}");
        ApiError::Internal
    })?;

    Ok(Html(token_page(&token)))
}

/// POST /auth/valid - echo the decoded claims when the credential holds
async fn validate(Extension(claims): Extension<SessionClaims>) -> Json<SessionClaims> {
    Json(claims)
}

/// The page served after a completed sign-in. It stores the token for the
/// SPA and bounces back to the board.
fn token_page(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>Signed in</title></head>
  <body>
    <script>
      localStorage.setItem("token", "{token}");
      window.location.replace("/");
    </script>
    <p>Signed in. You can close this window.</p>
  </body>
</html>
"#
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    let valid = Router::new()
        .route("/auth/valid", post(validate))
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize(&[])));

    Router::new()
        .route("/auth/:provider", get(begin_auth))
        .route("/auth/:provider/callback", get(oauth_callback))
        .merge(valid)
        .with_state(state)
}
