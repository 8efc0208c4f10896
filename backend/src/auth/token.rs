//! Session credential codec.
//!
//! Credentials are HS256 JWTs carrying the user's public claims. They are
//! integrity-protected, not confidential, and there is no server-side
//! session state: expiry is the only way a token dies.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// Validity window for issued credentials.
pub const TOKEN_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Claims carried inside a session credential. `exp` is milliseconds since
/// epoch, unlike the RFC's seconds; the codec checks it itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Local user id
    pub sub: String,
    pub group: String,
    pub name: String,
    pub avatar: String,
    pub exp: i64,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
    #[error("Token could not be signed: {0}")]
    Signing(String),
}

/// Stateless issue/verify over the shared signing secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is in milliseconds and checked against a caller-supplied
        // clock; the library's seconds-based check stays off.
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs the user's public claims, valid for the next 24 hours.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, chrono::Utc::now().timestamp_millis())
    }

    pub fn issue_at(&self, user: &User, now_ms: i64) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sub: user.id.clone(),
            group: user.group.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            exp: now_ms + TOKEN_TTL_MS,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Checks integrity and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp_millis())
    }

    /// Like [`verify`](Self::verify) with an explicit clock. Structural
    /// problems fail before the signature is considered; the signature
    /// comparison itself happens inside the JWT library, constant-time.
    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<SessionClaims, TokenError> {
        let data =
            decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed,
                }
            })?;

        if now_ms > data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: "u-1".to_string(),
            provider: "github".to_string(),
            provider_id: "42".to_string(),
            name: "Ada".to_string(),
            avatar: "https://example.com/ada.png".to_string(),
            group: "user".to_string(),
            member_since: 1_000,
            last_login: 1_000,
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret-123")
    }

    /// Swap the first character of a token segment for a different one from
    /// the base64url alphabet, so the segment still decodes.
    fn tweak(segment: &str) -> String {
        let mut bytes = segment.as_bytes().to_vec();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let codec = codec();
        let user = test_user();
        let token = codec.issue_at(&user, 1_000_000).unwrap();

        assert_eq!(token.split('.').count(), 3);

        let claims = codec.verify_at(&token, 1_060_000).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.group, "user");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.avatar, "https://example.com/ada.png");
        assert_eq!(claims.exp, 1_000_000 + TOKEN_TTL_MS);
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let token = codec.issue_at(&test_user(), 1_000_000).unwrap();

        assert!(codec.verify_at(&token, 1_000_000 + TOKEN_TTL_MS).is_ok());
        assert_eq!(
            codec.verify_at(&token, 1_000_000 + TOKEN_TTL_MS + 1),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_expired_against_real_clock() {
        let codec = codec();
        let issued = chrono::Utc::now().timestamp_millis() - TOKEN_TTL_MS - 1_000;
        let token = codec.issue_at(&test_user(), issued).unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let codec = codec();
        let token = codec.issue_at(&test_user(), 1_000_000).unwrap();
        let segments: Vec<&str> = token.split('.').collect();

        let tampered = format!("{}.{}.{}", segments[0], segments[1], tweak(segments[2]));
        assert_eq!(
            codec.verify_at(&tampered, 1_000_000),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_fails() {
        let codec = codec();
        let token = codec.issue_at(&test_user(), 1_000_000).unwrap();
        let segments: Vec<&str> = token.split('.').collect();

        let tampered = format!("{}.{}.{}", segments[0], tweak(segments[1]), segments[2]);
        assert_eq!(
            codec.verify_at(&tampered, 1_000_000),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_foreign_secret_fails() {
        let token = codec().issue_at(&test_user(), 1_000_000).unwrap();
        let other = TokenCodec::new("a-different-secret-456");
        assert_eq!(
            other.verify_at(&token, 1_000_000),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();
        for token in ["", "garbage", "a.b", "a.b.c.d", "!!!.###.$$$"] {
            assert_eq!(
                codec.verify_at(token, 1_000_000),
                Err(TokenError::Malformed),
                "token {token:?} should be malformed"
            );
        }
    }
}
