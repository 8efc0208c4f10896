//! Builders shared by unit and integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::provider::{OAuthClient, ProviderEndpoints, ProviderProfile};
use crate::auth::resolver::resolve_sign_in;
use crate::auth::token::TokenCodec;
use crate::config::Config;
use crate::models::user::User;
use crate::store::Store;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret-0123456789";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        jwt_secret: TEST_SECRET.to_string(),
        callback_base_url: "http://localhost:3000".to_string(),
        github_client_id: "test-client".to_string(),
        github_client_secret: "test-client-secret".to_string(),
        google_client_id: String::new(),
        google_client_secret: String::new(),
        database_url: ":memory:".to_string(),
        log_level: "debug".to_string(),
        cors_origins: "*".to_string(),
    }
}

/// State backed by an in-memory store and the built-in provider set.
pub fn test_state() -> Arc<AppState> {
    let config = test_config();
    let oauth = OAuthClient::new(&config);
    state_with_oauth(config, oauth)
}

/// State whose "github" provider points at `base_url` (a mock server).
pub fn test_state_with_provider(base_url: &str) -> Arc<AppState> {
    let config = test_config();

    let mut providers = HashMap::new();
    providers.insert(
        "github".to_string(),
        ProviderEndpoints {
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            auth_url: format!("{base_url}/login/oauth/authorize"),
            token_url: format!("{base_url}/login/oauth/access_token"),
            profile_url: format!("{base_url}/user"),
            scope: "read:user".to_string(),
            subject_key: "id",
            name_key: "name",
            name_fallback_key: Some("login"),
            avatar_key: "avatar_url",
        },
    );

    let oauth = OAuthClient::with_providers(&config.callback_base_url, providers);
    state_with_oauth(config, oauth)
}

fn state_with_oauth(config: Config, oauth: OAuthClient) -> Arc<AppState> {
    let tokens = TokenCodec::new(&config.jwt_secret);
    let store = Store::open(&config.database_url).expect("in-memory store");

    Arc::new(AppState {
        config,
        tokens,
        oauth,
        store,
    })
}

/// Runs the sign-in path directly and returns the stored user.
pub fn seed_user(state: &AppState, provider: &str, provider_id: &str, name: &str) -> User {
    let profile = ProviderProfile {
        provider: provider.to_string(),
        subject_id: provider_id.to_string(),
        name: name.to_string(),
        avatar_url: format!("https://example.com/{provider_id}.png"),
    };
    resolve_sign_in(&state.store, &profile).expect("seed user")
}

/// Issues a session token for the given user with the default validity.
pub fn issue_token(state: &AppState, user: &User) -> String {
    state.tokens.issue(user).expect("token issue")
}
