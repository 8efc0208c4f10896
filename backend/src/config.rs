use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Secret used to sign session tokens. Must be at least 10 characters;
    /// a shorter secret is a fatal misconfiguration.
    pub jwt_secret: String,
    /// Base URL the identity providers redirect back to,
    /// e.g. http://localhost:3000
    pub callback_base_url: String,
    /// GitHub OAuth app credentials
    pub github_client_id: String,
    pub github_client_secret: String,
    /// Google OAuth app credentials
    pub google_client_id: String,
    pub google_client_secret: String,
    /// SQLite database URL
    pub database_url: String,
    /// Log level (default: info)
    pub log_level: String,
    /// CORS allowed origins (comma-separated, default: *)
    pub cors_origins: String,
}

/// Session tokens are HMAC-signed; anything shorter is guessable.
const MIN_SECRET_LEN: usize = 10;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigError::MissingEnvVar("JWT_SECRET"))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret(MIN_SECRET_LEN));
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            jwt_secret,
            callback_base_url: env::var("CALLBACK")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            github_client_id: env::var("GITHUB_KEY").unwrap_or_default(),
            github_client_secret: env::var("GITHUB_SECRET").unwrap_or_default(),
            google_client_id: env::var("GOOGLE_KEY").unwrap_or_default(),
            google_client_secret: env::var("GOOGLE_SECRET").unwrap_or_default(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/feedboard.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("JWT_SECRET must be at least {0} characters")]
    WeakSecret(usize),
    #[error("Invalid port number")]
    InvalidPort,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so all from_env paths are exercised in a
    // single test to avoid races between parallel test threads.
    #[test]
    fn test_from_env_secret_handling() {
        env::remove_var("JWT_SECRET");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("JWT_SECRET")));

        env::set_var("JWT_SECRET", "short");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::WeakSecret(_)));

        env::set_var("JWT_SECRET", "0123456789abcdef");
        let config = Config::from_env().unwrap();
        assert_eq!(config.jwt_secret, "0123456789abcdef");
        assert_eq!(config.port, 3000);
        env::remove_var("JWT_SECRET");
    }
}
