//! Request authorization.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::AppState;

/// Builds an authorization middleware for `middleware::from_fn_with_state`.
///
/// Requests must present a valid bearer credential; when `required_groups`
/// is non-empty the claims' group must also be a member. On success the
/// decoded claims are attached to the request, so downstream handlers take
/// them as `Extension<SessionClaims>`. On any failure the request is
/// answered with 401 and a reason, and no handler runs. No database is
/// touched here: the claims are trusted as signed, which means they can be
/// stale relative to the store until the token is re-issued.
pub fn authorize(
    required_groups: &'static [&'static str],
) -> impl Fn(State<Arc<AppState>>, Request, Next) -> Pin<Box<dyn Future<Output = Response> + Send>>
       + Clone {
    move |State(state): State<Arc<AppState>>, mut request: Request, next: Next| {
        Box::pin(async move {
            let token = match bearer_token(request.headers()) {
                Ok(token) => token,
                Err(reason) => return ApiError::Unauthorized(reason.to_string()).into_response(),
            };

            let claims = match state.tokens.verify(&token) {
                Ok(claims) => claims,
                Err(e) => return ApiError::Unauthorized(e.to_string()).into_response(),
            };

            if !required_groups.is_empty() && !required_groups.contains(&claims.group.as_str()) {
                return ApiError::Unauthorized("not allowed".to_string()).into_response();
            }

            request.extensions_mut().insert(claims);
            next.run(request).await
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("No authorization header set")?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token.to_string()),
        _ => Err("No bearer token set"),
    }
}
