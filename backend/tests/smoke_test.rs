use axum::Router;
use bytes::Bytes;
use http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedboard_backend::auth::authorize;
use feedboard_backend::models::user::User;
use feedboard_backend::routes;
use feedboard_backend::test_util::{issue_token, seed_user, test_state, test_state_with_provider};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(axum::body::Body::from(Bytes::from(body.to_string())))
            .unwrap()
    } else {
        builder.body(axum::body::Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, value)
}

fn message_of(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let app = routes::router(test_state());
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_message_mutations_require_auth() {
    let app = routes::router(test_state());

    for (method, uri) in [
        (Method::POST, "/message"),
        (Method::PATCH, "/message/some-id"),
        (Method::DELETE, "/message/some-id"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(message_of(&body), "No authorization header set");
    }
}

#[tokio::test]
async fn test_bearer_rejections_carry_reasons() {
    let state = test_state();
    let user = seed_user(&state, "github", "42", "Ada");
    let app = routes::router(state.clone());

    // Wrong scheme
    let request = http::Request::builder()
        .method(Method::POST)
        .uri("/auth/valid")
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/valid",
        Some("not.a.token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(&body), "Malformed token");

    // Tampered signature
    let token = issue_token(&state, &user);
    let tampered = format!("{}x", token);
    let (status, body) = send(&app, Method::POST, "/auth/valid", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        message_of(&body) == "Invalid token signature" || message_of(&body) == "Malformed token"
    );

    // Expired token
    let old = chrono::Utc::now().timestamp_millis()
        - feedboard_backend::auth::token::TOKEN_TTL_MS
        - 1_000;
    let expired = state.tokens.issue_at(&user, old).unwrap();
    let (status, body) = send(&app, Method::POST, "/auth/valid", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(&body), "Token expired");
}

#[tokio::test]
async fn test_auth_valid_echoes_claims() {
    let state = test_state();
    let user = seed_user(&state, "github", "42", "Ada");
    let token = issue_token(&state, &user);
    let app = routes::router(state);

    let (status, body) = send(&app, Method::POST, "/auth/valid", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sub"], user.id.as_str());
    assert_eq!(body["group"], "user");
    assert_eq!(body["name"], "Ada");
}

#[tokio::test]
async fn test_group_requirement() {
    let state = test_state();
    let user = seed_user(&state, "github", "42", "Ada");
    let token = issue_token(&state, &user);

    let app: Router = Router::new()
        .route("/admin/ping", axum::routing::get(|| async { "pong" }))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authorize(&["admin"]),
        ));

    // A regular user is turned away
    let (status, body) = send(&app, Method::GET, "/admin/ping", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(&body), "not allowed");

    // A token carrying the admin group passes
    let admin = User {
        group: "admin".to_string(),
        ..user
    };
    let admin_token = issue_token(&state, &admin);
    let (status, _) = send(&app, Method::GET, "/admin/ping", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_message_lifecycle_enforces_ownership() {
    let state = test_state();
    let ada = seed_user(&state, "github", "42", "Ada");
    let bob = seed_user(&state, "github", "43", "Bob");
    let ada_token = issue_token(&state, &ada);
    let bob_token = issue_token(&state, &bob);
    let app = routes::router(state);

    // Ada posts
    let (status, created) = send(
        &app,
        Method::POST,
        "/message",
        Some(&ada_token),
        Some(json!({ "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["authorId"], ada.id.as_str());
    assert_eq!(created["content"], "hi");
    let id = created["id"].as_str().unwrap().to_string();

    // Bob can read but not touch
    let (status, _) = send(&app, Method::GET, &format!("/message/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/message/{id}"),
        Some(&bob_token),
        Some(json!({ "content": "mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message_of(&body), "message not found");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/message/{id}"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Untouched after Bob's attempts
    let (_, fetched) = send(&app, Method::GET, &format!("/message/{id}"), None, None).await;
    assert_eq!(fetched["content"], "hi");

    // Ada edits her own post
    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/message/{id}"),
        Some(&ada_token),
        Some(json!({ "content": "hi again" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "hi again");
    assert_eq!(updated["authorId"], ada.id.as_str());

    // And deletes it
    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/message/{id}"),
        Some(&ada_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message_of(&body), "message deleted");

    let (status, _) = send(&app, Method::GET, &format!("/message/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_content_writes_nothing() {
    let state = test_state();
    let user = seed_user(&state, "github", "42", "Ada");
    let token = issue_token(&state, &user);
    let app = routes::router(state);

    let (status, body) = send(
        &app,
        Method::POST,
        "/message",
        Some(&token),
        Some(json!({ "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(message_of(&body), "message content must not be empty");

    // Body without the field behaves the same
    let (status, _) = send(&app, Method::POST, "/message", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, listed) = send(&app, Method::GET, "/message", None, None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_public_profile_hides_provider_identity() {
    let state = test_state();
    let user = seed_user(&state, "github", "42", "Ada");
    let app = routes::router(state);

    let (status, body) = send(&app, Method::GET, &format!("/user/{}", user.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user.id.as_str());
    assert_eq!(body["name"], "Ada");
    assert!(body.get("avatar").is_some());
    assert!(body.get("provider").is_none());
    assert!(body.get("providerId").is_none());

    let (status, body) = send(&app, Method::GET, "/user/unknown", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message_of(&body), "user not found");
}

#[tokio::test]
async fn test_begin_auth_redirects_to_provider() {
    let app = routes::router(test_state());

    let request = http::Request::builder()
        .method(Method::GET)
        .uri("/auth/github")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(location.contains("client_id=test-client"));
    assert!(location.contains("state="));

    let (status, body) = send(&app, Method::GET, "/auth/myspace", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message_of(&body), "unknown provider: myspace");
}

#[tokio::test]
async fn test_callback_without_code_is_rejected() {
    let app = routes::router(test_state());
    let (status, body) = send(&app, Method::GET, "/auth/github/callback", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(message_of(&body), "missing authorization code");
}

/// Full sign-in against a mocked provider, then the token is used to post.
#[tokio::test]
async fn test_oauth_callback_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "gh-token" })),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "name": "Ada",
            "login": "ada",
            "avatar_url": "https://example.com/ada.png"
        })))
        .mount(&mock_server)
        .await;

    let state = test_state_with_provider(&mock_server.uri());
    let app = routes::router(state.clone());

    let (status, page) = send(
        &app,
        Method::GET,
        "/auth/github/callback?code=abc&state=nonce",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The page embeds the token for the SPA to pick up
    let page = page.as_str().unwrap();
    let marker = "localStorage.setItem(\"token\", \"";
    let start = page.find(marker).unwrap() + marker.len();
    let token = &page[start..start + page[start..].find('"').unwrap()];

    let claims = state.tokens.verify(token).unwrap();
    assert_eq!(claims.name, "Ada");
    assert_eq!(claims.group, "user");

    let stored = state
        .store
        .find_user_by_provider("github", "42")
        .unwrap()
        .unwrap();
    assert_eq!(claims.sub, stored.id);

    // Signing in again keeps the same local identity
    let (status, _) = send(
        &app,
        Method::GET,
        "/auth/github/callback?code=def&state=nonce2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let again = state
        .store
        .find_user_by_provider("github", "42")
        .unwrap()
        .unwrap();
    assert_eq!(again.id, stored.id);
    assert_eq!(again.member_since, stored.member_since);

    // The issued credential works against the protected surface
    let (status, created) = send(
        &app,
        Method::POST,
        "/message",
        Some(token),
        Some(json!({ "content": "hello from ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["authorId"], stored.id.as_str());
}
