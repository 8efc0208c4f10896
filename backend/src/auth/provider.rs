//! Boundary to the third-party identity providers.
//!
//! Feedboard never sees a password; the browser is handed to the provider
//! and the callback code is exchanged for an access token, which buys one
//! profile fetch. Endpoints are plain data so tests can point a provider at
//! a mock server.

use std::collections::HashMap;

use reqwest::{header, Client, Url};
use serde::Deserialize;

use crate::config::Config;

/// Identity and profile fields fetched from a provider after sign-in.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: String,
    /// Subject id assigned by the provider
    pub subject_id: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    Unknown(String),
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("profile fetch failed: {0}")]
    Profile(String),
}

/// Endpoint set and profile-response shape for one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub scope: String,
    /// Profile JSON field holding the subject id (number or string)
    pub subject_key: &'static str,
    pub name_key: &'static str,
    /// Field to fall back to when the name is absent or null
    pub name_fallback_key: Option<&'static str>,
    pub avatar_key: &'static str,
}

/// Client for the OAuth code flow against the configured providers.
pub struct OAuthClient {
    http: Client,
    redirect_base: String,
    providers: HashMap<String, ProviderEndpoints>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OAuthClient {
    /// Client with the built-in GitHub and Google endpoint sets.
    pub fn new(config: &Config) -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "github".to_string(),
            ProviderEndpoints {
                client_id: config.github_client_id.clone(),
                client_secret: config.github_client_secret.clone(),
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                profile_url: "https://api.github.com/user".to_string(),
                scope: "read:user".to_string(),
                subject_key: "id",
                name_key: "name",
                name_fallback_key: Some("login"),
                avatar_key: "avatar_url",
            },
        );
        providers.insert(
            "google".to_string(),
            ProviderEndpoints {
                client_id: config.google_client_id.clone(),
                client_secret: config.google_client_secret.clone(),
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                profile_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                scope: "openid profile".to_string(),
                subject_key: "sub",
                name_key: "name",
                name_fallback_key: None,
                avatar_key: "picture",
            },
        );
        Self::with_providers(&config.callback_base_url, providers)
    }

    pub fn with_providers(
        redirect_base: &str,
        providers: HashMap<String, ProviderEndpoints>,
    ) -> Self {
        Self {
            http: Client::new(),
            redirect_base: redirect_base.trim_end_matches('/').to_string(),
            providers,
        }
    }

    fn endpoints(&self, provider: &str) -> Result<&ProviderEndpoints, ProviderError> {
        self.providers
            .get(provider)
            .ok_or_else(|| ProviderError::Unknown(provider.to_string()))
    }

    fn redirect_uri(&self, provider: &str) -> String {
        format!("{}/auth/{}/callback", self.redirect_base, provider)
    }

    /// URL the browser is sent to for sign-in with the given provider.
    pub fn authorize_url(&self, provider: &str, state: &str) -> Result<String, ProviderError> {
        let endpoints = self.endpoints(provider)?;
        let redirect = self.redirect_uri(provider);

        let url = Url::parse_with_params(
            &endpoints.auth_url,
            &[
                ("client_id", endpoints.client_id.as_str()),
                ("redirect_uri", redirect.as_str()),
                ("scope", endpoints.scope.as_str()),
                ("state", state),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| ProviderError::Exchange(e.to_string()))?;

        Ok(url.to_string())
    }

    /// Completes the callback: code -> access token -> profile.
    pub async fn exchange_code(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        let endpoints = self.endpoints(provider)?;
        let redirect = self.redirect_uri(provider);

        // GitHub answers with form-encoding unless JSON is asked for
        let response = self
            .http
            .post(&endpoints.token_url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("client_id", endpoints.client_id.as_str()),
                ("client_secret", endpoints.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Exchange(e.to_string()))?;

        let token: TokenResponse = response
            .error_for_status()
            .map_err(|e| ProviderError::Exchange(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Exchange(e.to_string()))?;

        let profile: serde_json::Value = self
            .http
            .get(&endpoints.profile_url)
            .bearer_auth(&token.access_token)
            .header(header::USER_AGENT, "feedboard")
            .send()
            .await
            .map_err(|e| ProviderError::Profile(e.to_string()))?
            .error_for_status()
            .map_err(|e| ProviderError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Profile(e.to_string()))?;

        let subject_id = match profile.get(endpoints.subject_key) {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => {
                return Err(ProviderError::Profile(format!(
                    "no {} field in profile",
                    endpoints.subject_key
                )))
            }
        };

        let name = field_str(&profile, endpoints.name_key)
            .or_else(|| {
                endpoints
                    .name_fallback_key
                    .and_then(|key| field_str(&profile, key))
            })
            .unwrap_or_default();
        let avatar_url = field_str(&profile, endpoints.avatar_key).unwrap_or_default();

        Ok(ProviderProfile {
            provider: provider.to_string(),
            subject_id,
            name,
            avatar_url,
        })
    }
}

fn field_str(profile: &serde_json::Value, key: &str) -> Option<String> {
    profile.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Random nonce for the OAuth state parameter.
pub fn oauth_state() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
