use crate::error::{Result, RoomError};
use anyhow::Context;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp,
};
use onair_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

struct VerifierKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// HS256 bearer token verifier. Tokens are minted elsewhere; `issue` exists
/// for tests and local tooling.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<VerifierKeys>,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            keys: Arc::new(VerifierKeys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation: Validation::new(Algorithm::HS256),
            }),
        }
    }

    pub fn verify(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.keys.validation)
            .map_err(|e| RoomError::unauthorized(format!("invalid token: {}", e)))?;
        Ok(UserId(data.claims.sub))
    }

    pub fn issue(&self, user: &UserId, ttl: Duration) -> Result<String> {
        let claims = Claims {
            sub: user.0.clone(),
            exp: get_current_timestamp() + ttl.as_secs(),
        };
        self.issue_claims(&claims)
    }

    pub fn issue_claims(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .context("Failed to sign token")?;
        Ok(token)
    }
}

/// Extracts the verified caller from `Authorization: Bearer <token>`.
/// Rejects with 401 when the header is missing or the token does not verify.
pub struct AuthUser(pub UserId);

impl<S> FromRequestParts<S> for AuthUser
where
    TokenVerifier: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RoomError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = TokenVerifier::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| RoomError::unauthorized("missing Authorization header"))?
            .to_str()
            .map_err(|_| RoomError::unauthorized("malformed Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RoomError::unauthorized("expected a Bearer token"))?;

        verifier.verify(token).map(AuthUser)
    }
}
