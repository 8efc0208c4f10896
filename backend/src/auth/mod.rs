pub mod middleware;
pub mod provider;
pub mod resolver;
pub mod token;

pub use middleware::authorize;
pub use provider::{OAuthClient, ProviderError, ProviderProfile};
pub use resolver::resolve_sign_in;
pub use token::{SessionClaims, TokenCodec, TokenError};
