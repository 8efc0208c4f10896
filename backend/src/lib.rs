pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use auth::{OAuthClient, SessionClaims, TokenCodec};
pub use config::Config;
pub use error::ApiError;
pub use store::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenCodec,
    pub oauth: OAuthClient,
    pub store: Store,
}
