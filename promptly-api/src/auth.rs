//! Authentication for the Promptly API.
//!
//! Clients present bearer session tokens issued by the external identity
//! provider. Sessions are HS256 JWTs verified against the provider secret
//! key; the middleware rejects the request before any store or AI work
//! happens when the token is missing or invalid.

use anyhow::Result;
use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;

/// Session token expiry used when minting tokens locally.
const SESSION_EXPIRY_SECS: u64 = 86400;

/// Session claims carried by the identity provider's JWTs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (external user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Email claim, when the provider includes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authentication state shared across requests.
#[derive(Clone)]
pub struct AuthState {
    secret: Arc<String>,
}

impl AuthState {
    /// Create auth state from the identity-provider secret key.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }

    /// Validate a session token and return its claims.
    pub fn validate_session(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Mint a session token for a user.
    ///
    /// Mirrors the provider's session format; used by development tooling
    /// and tests.
    pub fn issue_session(&self, user_id: &str, email: Option<&str>) -> Result<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + SESSION_EXPIRY_SECS as usize,
            iat: now,
            email: email.map(|e| e.to_string()),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }
}

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// External identity-provider user ID
    pub user_id: String,
    /// Email claim from the session, if present
    pub email: Option<String>,
}

/// Authentication middleware.
///
/// Extracts the bearer token, validates it, and inserts [`AuthUser`] into
/// request extensions. Failure short-circuits with 401 and the fixed
/// `Authentication required` body.
pub async fn auth_middleware(
    auth_state: axum::extract::State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(ApiError::auth()),
    };

    match auth_state.validate_session(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser {
                user_id: claims.sub,
                email: claims.email,
            });
            Ok(next.run(request).await)
        }
        Err(_) => Err(ApiError::auth()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrip() {
        let auth = AuthState::new("sk_test_secret-key-32-bytes-long!!");
        let token = auth
            .issue_session("user_2abc", Some("quinn@example.com"))
            .unwrap();
        let claims = auth.validate_session(&token).unwrap();
        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.email.as_deref(), Some("quinn@example.com"));
    }

    #[test]
    fn test_invalid_token() {
        let auth = AuthState::new("sk_test_secret-key-32-bytes-long!!");
        assert!(auth.validate_session("not-a-token").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = AuthState::new("sk_test_secret-one");
        let verifier = AuthState::new("sk_test_secret-two");
        let token = issuer.issue_session("user_2abc", None).unwrap();
        assert!(verifier.validate_session(&token).is_err());
    }
}
