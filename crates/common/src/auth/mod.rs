//! Authentication utilities
//!
//! Provides:
//! - Session token (JWT) generation and validation
//! - Password hashing for person credentials
//! - `SessionIdentity` extraction from request headers

use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// The authenticated (or anonymous) identity behind a request.
///
/// Carries the claims decoded from a validated session token. Every claim is
/// optional: a request without an Authorization header yields an anonymous
/// identity, and downstream identity resolution decides what that means.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Person ID claim (token subject), if present
    pub person_id: Option<Uuid>,

    /// Email-shaped principal claim, if present
    pub email: Option<String>,

    /// Request ID for tracing
    pub request_id: String,
}

impl SessionIdentity {
    /// An identity with no claims (no session / not logged in)
    pub fn anonymous(request_id: impl Into<String>) -> Self {
        Self {
            person_id: None,
            email: None,
            request_id: request_id.into(),
        }
    }

    /// Whether any principal claim is attached
    pub fn is_anonymous(&self) -> bool {
        self.person_id.is_none() && self.email.is_none()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (person ID)
    pub sub: String,

    /// Email of the person the token was issued to
    pub email: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Token lifetime in seconds
    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }

    /// Generate a new session token
    pub fn generate_token(&self, person_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: person_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            })
    }

    /// Validate and decode a session token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::unauthenticated("invalid session token"),
            })
    }
}

/// Hash a password for storage (argon2, PHC string format)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Shared token manager, injectable into router state
#[derive(Clone)]
pub struct AuthState(pub Arc<JwtManager>);

/// Axum extractor for SessionIdentity
///
/// A missing Authorization header produces an anonymous identity rather than
/// a rejection; whether anonymity is acceptable is the endpoint's decision.
/// A present-but-invalid token is always rejected.
impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(auth_header) = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(SessionIdentity::anonymous(request_id));
        };

        let token = extract_bearer_token(auth_header)
            .ok_or_else(|| AppError::unauthenticated("malformed Authorization header"))?;

        let AuthState(jwt) = AuthState::from_ref(state);
        let claims = jwt.validate_token(token)?;

        let person_id = Uuid::parse_str(&claims.sub).ok();

        Ok(SessionIdentity {
            person_id,
            email: Some(claims.email),
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("abc123"), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let person_id = Uuid::new_v4();
        let token = manager.generate_token(person_id, "fan@example.com").unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, person_id.to_string());
        assert_eq!(claims.email, "fan@example.com");
    }

    #[test]
    fn test_invalid_token_is_unauthenticated() {
        let manager = JwtManager::new("test_secret", 3600);
        let err = manager.validate_token("garbage").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn test_anonymous_identity() {
        let identity = SessionIdentity::anonymous("req-1");
        assert!(identity.is_anonymous());
        assert!(identity.email.is_none());
    }
}
